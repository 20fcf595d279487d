use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Metadata carried by every raw file name: `<basin>_<year>[_<month>].txt`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocMeta {
    pub basin: String,
    pub year: String,
    pub month: Option<String>,
}

/// Metadata field used to group documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupField {
    Basin,
    Year,
    Month,
}

impl DocMeta {
    /// Parse the base file name.
    /// Everything from the first `.` on is dropped before splitting on `_`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = name.split('.').next().unwrap_or_default();
        let parts: Vec<&str> = stem.split('_').collect();
        match parts.as_slice() {
            [basin, year] => Ok(DocMeta {
                basin: basin.to_string(),
                year: year.to_string(),
                month: None,
            }),
            [basin, year, month] => Ok(DocMeta {
                basin: basin.to_string(),
                year: year.to_string(),
                month: Some(month.to_string()),
            }),
            _ => Err(PipelineError::MetadataParse {
                path: path.to_path_buf(),
                parts: parts.len(),
            }),
        }
    }

    /// Value of `field`, `None` only for an unset month
    pub fn get(&self, field: GroupField) -> Option<&str> {
        match field {
            GroupField::Basin => Some(&self.basin),
            GroupField::Year => Some(&self.year),
            GroupField::Month => self.month.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_and_three_part_names() {
        let m = DocMeta::from_path("/data/raw/nile_2007.txt").unwrap();
        assert_eq!(m.basin, "nile");
        assert_eq!(m.year, "2007");
        assert_eq!(m.month, None);

        let m = DocMeta::from_path("mekong_2008_11.txt").unwrap();
        assert_eq!(m.month.as_deref(), Some("11"));
        assert_eq!(m.get(GroupField::Year), Some("2008"));
    }

    #[test]
    fn extension_is_cut_at_first_dot() {
        let m = DocMeta::from_path("indus_2010.v2.txt").unwrap();
        assert_eq!(m.basin, "indus");
        assert_eq!(m.year, "2010");
    }

    #[test]
    fn other_part_counts_fail() {
        for name in ["nile.txt", "nile_2007_07_01.txt", "a_b_c_d_e.txt"] {
            match DocMeta::from_path(name) {
                Err(PipelineError::MetadataParse { parts, .. }) => assert_ne!(parts, 2),
                other => panic!("{name}: unexpected {other:?}"),
            }
        }
    }
}
