//! Command-line surface: a single optional mode token.

use std::fmt;

use clap::Parser;

/// Serve a directory over HTTP, or over HTTPS with a throwaway
/// self-signed certificate, adding permissive CORS headers to every response.
#[derive(Debug, Parser)]
#[command(name = "devserve", version, about)]
pub struct Cli {
    /// `https` (any case) serves over TLS; anything else serves plain HTTP.
    #[arg(value_name = "MODE", allow_hyphen_values = true)]
    pub mode: Option<String>,

    /// Tokens after the mode are accepted and ignored.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    _rest: Vec<String>,
}

impl Cli {
    /// The transport the user asked for.
    pub fn mode(&self) -> Mode {
        Mode::from_arg(self.mode.as_deref())
    }
}

/// Requested serving mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Http,
    Https,
}

impl Mode {
    /// Only a case-insensitive `https` selects TLS. Unknown tokens fall through
    /// to HTTP rather than erroring.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            Some(token) if token.eq_ignore_ascii_case("https") => Mode::Https,
            _ => Mode::Http,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Http => f.write_str("http"),
            Mode::Https => f.write_str("https"),
        }
    }
}
