//! Screen clearing for the plain progress renderer. The backend is picked at
//! compile time; platforms without one get a no-op.

#[cfg(unix)]
pub fn clear_screen() {
    use std::io::Write;

    let mut stdout = std::io::stdout();
    // Erase display, then move the cursor home.
    if let Err(e) = stdout
        .write_all(b"\x1b[2J\x1b[H")
        .and_then(|_| stdout.flush())
    {
        log::debug!("Could not clear the terminal: {}", e);
    }
}

#[cfg(windows)]
pub fn clear_screen() {
    if let Err(e) = std::process::Command::new("cmd").args(["/c", "cls"]).status() {
        log::debug!("Could not clear the terminal: {}", e);
    }
}

#[cfg(not(any(unix, windows)))]
pub fn clear_screen() {}
