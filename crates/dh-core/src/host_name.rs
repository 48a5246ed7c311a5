//! Strongly-typed host name.

use crate::newtype_string::define_newtype_string;

define_newtype_string! {
    /// A non-empty remote host name as written in the configuration.
    pub struct HostName;
}

impl HostName {
    /// Hosts named `localhost` are driven without ssh.
    pub fn is_local(&self) -> bool {
        self.as_str() == "localhost"
    }
}
