pub mod console;
pub mod csv_report;
pub mod scatter_plot;

pub use console::{format_risk_report, format_summary, print_summary};
pub use csv_report::{save_csv, write_csv};
pub use scatter_plot::ScatterPlot;
