mod args;
mod io;
mod ops;
mod options;
mod output;

pub use options::run;
