use std::process::ExitCode;

fn main() -> ExitCode {
    reaio_lib::run()
}
