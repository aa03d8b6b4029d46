mod progress;
mod styling;
mod tables;

pub use progress::WalkProgress;
pub use styling::{dim, failure, notice, success, title};
pub use tables::print_failures;

/// Prints the jenkins-helpers banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        title("jenkins-helpers"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Jenkins branch job tooling")
    );
}
