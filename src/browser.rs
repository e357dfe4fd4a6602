use crate::{KeywordIdeasError, Result};

/// Open a URL in the user's default web browser
///
/// Used to send the user to the Google consent screen. Callers treat a
/// failure as non-fatal since the URL is printed as well.
///
/// # Errors
///
/// Returns an error if the browser cannot be launched
pub fn open_browser(url: &str) -> Result<()> {
    webbrowser::open(url).map_err(|e| KeywordIdeasError::BrowserLaunch(e.to_string()))
}
