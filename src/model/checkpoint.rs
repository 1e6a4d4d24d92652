use std::fmt;
use std::str::FromStr;

use crate::error::EvalError;

/// Named weight snapshot stored inside a run directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    View0,
    View1,
    Avg,
    Latest,
}

impl Checkpoint {
    pub const ALL: [Checkpoint; 4] = [
        Checkpoint::View0,
        Checkpoint::View1,
        Checkpoint::Avg,
        Checkpoint::Latest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Checkpoint::View0 => "view0",
            Checkpoint::View1 => "view1",
            Checkpoint::Avg => "avg",
            Checkpoint::Latest => "latest",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Checkpoint {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Checkpoint::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                EvalError::precondition(format!(
                    "weights to load must be one of view0, view1, avg, latest (got {s:?})"
                ))
            })
    }
}
