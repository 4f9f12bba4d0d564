pub mod chart;
pub mod glyphs;
pub mod raster;
pub mod table;

pub use chart::{render_chart, ChartImage, ChartRenderer, ChartSeries, ImageBlock};
pub use raster::BarChartRenderer;
pub use table::{render_table, render_totals_table, CellRole, TableBlock, TableCell};
