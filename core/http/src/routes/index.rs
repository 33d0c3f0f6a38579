/// Version banner.
pub const VERSION_TEXT: &str = concat!("OpenCDN v", env!("CARGO_PKG_VERSION"));

pub async fn handler() -> &'static str {
    VERSION_TEXT
}
