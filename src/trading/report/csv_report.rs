use std::fs::File;
use std::io;
use std::path::Path;

use tracing::info;

use crate::error::AppResult;
use crate::trading::model::MetricsTable;

/// 按表格顺序写出全部记录，未知市值留空
pub fn write_csv<W: io::Write>(out: W, table: &MetricsTable) -> AppResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    for record in table {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_csv(path: &Path, table: &MetricsTable) -> AppResult<()> {
    write_csv(File::create(path)?, table)?;
    info!("CSV saved to {} ({} rows)", path.display(), table.len());
    Ok(())
}
