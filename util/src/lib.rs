pub mod say;
