pub mod file;
pub mod stdin;

use finreport_core::config::ReportConfig;

/// Resolve the report configuration: `--config` file, then piped stdin,
/// then the built-in fixture.
pub fn load_config(path: Option<&str>) -> Result<ReportConfig, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_config(path);
    }
    if let Some(config) = stdin::read_stdin()? {
        return Ok(config);
    }
    Ok(ReportConfig::default())
}
