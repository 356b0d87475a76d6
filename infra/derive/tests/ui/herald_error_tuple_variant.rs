use herald_derive::herald_error;

#[herald_error]
pub enum DemoError {
    Io(std::io::Error),
}

fn main() {}
