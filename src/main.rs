use campusdesk::cli::Cli;

fn main() {
    // Failures are logged inside `handle_command_line` while the logger is
    // still running; notifier output is not repeated here
    if let Err(err) = Cli::handle_command_line() {
        if !err.already_reported() {
            eprintln!("{}", err);
        }
        std::process::exit(1);
    }
}
