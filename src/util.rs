use std::sync::LazyLock;

use regex::Regex;

mod temp_file;

pub use temp_file::{TempFile, TempFileStream};

// strip credentials from a proxy url before it ends up in logs
pub fn redact_proxy(proxy: &str) -> String {
  static AUTH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"//[^:/@]+(:[^@]+)?@").expect("valid regex")
  });
  AUTH_REGEX.replace(proxy, "//<REDACTED>@").into_owned()
}

// header-safe rendition of a file name for Content-Disposition
pub fn attachment_name(name: &str) -> String {
  name
    .chars()
    .filter(|c| *c != '"')
    .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
    .collect()
}
