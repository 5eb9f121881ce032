// The on-disk list of CTF files to compare.
//
// `ctflist.db` is one stream name per line.  List position (1-based)
// is the stream id embedded in TDNs, so order is significant and names
// are never duplicated.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use crate::ctf::CtfError;
use crate::index::tdn::MAX_STREAMS;

/// Default list file name.
pub const CTFLIST_DB: &str = "ctflist.db";

/// Ordered, 1-indexed list of CTF stream names.
#[derive(Debug)]
pub struct CtfList {
    /// Slot 0 unused, matching the id packing.
    names: Vec<String>,
}

impl Default for CtfList {
    fn default() -> Self {
        Self::new()
    }
}

impl CtfList {
    pub fn new() -> Self {
        Self {
            names: vec![String::new()],
        }
    }

    /// Load the list from disk.  A missing file is an empty list.
    pub fn load(path: &Path) -> io::Result<Self> {
        let mut list = Self::new();
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(list),
            Err(e) => return Err(e),
        };
        for line in BufReader::new(file).lines() {
            let line = line?;
            let name = line.trim_end();
            if name.is_empty() {
                continue;
            }
            if list.names.len() >= MAX_STREAMS {
                break;
            }
            list.names.push(name.to_string());
        }
        Ok(list)
    }

    /// Number of listed streams.
    pub fn len(&self) -> usize {
        self.names.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The name at a stream id.
    pub fn name(&self, id: u16) -> Option<&str> {
        match id {
            0 => None,
            _ => self.names.get(id as usize).map(String::as_str),
        }
    }

    /// The stream id of a name already in the list.
    pub fn id_of(&self, name: &str) -> Option<u16> {
        self.names
            .iter()
            .skip(1)
            .position(|n| n == name)
            .map(|i| (i + 1) as u16)
    }

    /// Add a name, returning its id; an existing name returns the id
    /// it already has.
    pub fn add(&mut self, name: &str) -> Result<u16, CtfError> {
        if let Some(id) = self.id_of(name) {
            return Ok(id);
        }
        if self.names.len() >= MAX_STREAMS {
            return Err(CtfError::CapacityExceeded("stream id space (4096)"));
        }
        self.names.push(name.to_string());
        Ok((self.names.len() - 1) as u16)
    }

    /// Append a name to the on-disk list.
    pub fn append_on_disk(path: &Path, name: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).create(true).open(path)?;
        writeln!(file, "{name}")
    }

    /// Iterate `(id, name)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &str)> {
        self.names
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, n)| (i as u16, n.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_one_based_and_ordered() {
        let mut list = CtfList::new();
        assert_eq!(list.add("a.ctf").unwrap(), 1);
        assert_eq!(list.add("b.ctf").unwrap(), 2);
        assert_eq!(list.name(1), Some("a.ctf"));
        assert_eq!(list.name(2), Some("b.ctf"));
        assert_eq!(list.name(0), None);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn duplicate_names_return_existing_id() {
        let mut list = CtfList::new();
        assert_eq!(list.add("a.ctf").unwrap(), 1);
        assert_eq!(list.add("a.ctf").unwrap(), 1);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn missing_file_loads_empty() {
        let list = CtfList::load(Path::new("/nonexistent/ctflist.db")).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn iter_yields_ordered_pairs() {
        let mut list = CtfList::new();
        list.add("x").unwrap();
        list.add("y").unwrap();
        let pairs: Vec<_> = list.iter().collect();
        assert_eq!(pairs, vec![(1, "x"), (2, "y")]);
    }
}
