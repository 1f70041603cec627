//! Interactive prompts: build confirmation and the network fallback.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use tb3img_core::NetworkCredential;

/// Ask a y/n question on stderr and read the answer from stdin. Anything
/// not starting with `y` declines.
pub fn confirm(message: &str) -> Result<bool> {
  write!(io::stderr(), "{message} (y/n): ")?;
  io::stderr().flush()?;

  let mut input = String::new();
  io::stdin().lock().read_line(&mut input)?;

  Ok(input.trim().to_ascii_lowercase().starts_with('y'))
}

/// Ask for an SSID and password when the configuration requested network
/// setup without supplying credentials. A blank SSID skips network setup.
pub fn prompt_network() -> Result<Option<NetworkCredential>> {
  let ssid = read_line("SSID: ")?;
  if ssid.is_empty() {
    return Ok(None);
  }

  let password = read_line("Password (leave blank if none): ")?;
  Ok(Some(NetworkCredential { ssid, password }))
}

fn read_line(prompt: &str) -> Result<String> {
  write!(io::stderr(), "{prompt}")?;
  io::stderr().flush()?;

  let mut input = String::new();
  io::stdin().lock().read_line(&mut input)?;
  Ok(input.trim().to_string())
}
