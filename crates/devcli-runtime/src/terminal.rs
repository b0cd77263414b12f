//! Enter/exit banners around the interactive container shell.

fn banner_line(container: &str, image: &str) -> String {
    format!("\x1b[1;36m[devcli]\x1b[0m entering \x1b[1m{container}\x1b[0m ({image})")
}

fn exit_line(container: &str) -> String {
    format!("\x1b[1;36m[devcli]\x1b[0m left {container}")
}

pub fn print_container_banner(container: &str, image: &str) {
    if is_interactive_terminal() {
        eprintln!("{}", banner_line(container, image));
    }
}

pub fn print_container_exit(container: &str) {
    if is_interactive_terminal() {
        eprintln!("{}", exit_line(container));
    }
}

#[allow(unsafe_code)]
fn is_interactive_terminal() -> bool {
    // SAFETY: isatty() only inspects the descriptor.
    unsafe { libc::isatty(libc::STDERR_FILENO) != 0 }
}
