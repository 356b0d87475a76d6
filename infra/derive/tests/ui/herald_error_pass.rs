use herald_derive::herald_error;
use std::borrow::Cow;

#[herald_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Not registered{}: {message}", format_context(.context))]
    NotRegistered { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn open() -> Result<(), DemoError> {
    Err(std::io::Error::other("boom")).context("Opening the journal")
}

fn main() {
    let err = open().unwrap_err();
    assert_eq!(err.to_string(), "IO error (Opening the journal): boom");

    let err: Result<(), DemoError> =
        Err(DemoError::NotRegistered { message: "listener".into(), context: None });
    let err = err.context("Unregistering").unwrap_err();
    assert_eq!(err.to_string(), "Not registered (Unregistering): listener");
}
