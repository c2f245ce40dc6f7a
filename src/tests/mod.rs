#[cfg(test)]
mod common;



#[cfg(all(test, unix))]
mod session_test;
