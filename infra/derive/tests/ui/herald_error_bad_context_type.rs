use herald_derive::herald_error;

#[herald_error]
pub enum DemoError {
    #[error("Rejected: {message}")]
    Rejected { message: String, context: Option<String> },
}

fn main() {}
