//! Upload policy: which names and sizes the store accepts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::ownership::OWNERSHIP_FILE;
use opencdn_common::{check_segment, Error, Result};

/// Characters accepted in filenames unless configured otherwise.
pub const DEFAULT_FILENAME_CHARACTERS: &str = concat!(
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ",
    "1234567890",
    ",;.:-_<>!\"§$%&()=?`´|#'+*@€ß "
);

/// Characters accepted in group names unless configured otherwise.
pub const DEFAULT_GROUPNAME_CHARACTERS: &str = concat!(
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ",
    "1234567890",
    ",;.:-_<>!\"§$%&()=?|#'+*@€ß "
);

/// Default maximum object size (50 MiB).
pub const DEFAULT_MAX_OBJECT_BYTES: u64 = 50 * 1024 * 1024;

/// An allow-list of characters.
///
/// Path separators can never be part of the set.
#[derive(Clone, PartialEq, Eq)]
pub struct CharacterSet {
    chars: BTreeSet<char>,
}

impl CharacterSet {
    /// Build a set from every character of `chars`.
    ///
    /// # Errors
    /// - `Error::Config` if the set contains `/` or `\`
    pub fn new(chars: &str) -> Result<Self> {
        if chars.contains('/') || chars.contains('\\') {
            return Err(Error::Config(
                "Allowed characters cannot include path separators".to_string(),
            ));
        }
        Ok(Self {
            chars: chars.chars().collect(),
        })
    }

    /// Check whether every character of `value` is allowed.
    pub fn allows(&self, value: &str) -> bool {
        value.chars().all(|c| self.chars.contains(&c))
    }

    /// First character of `value` that is not allowed, if any.
    pub fn first_disallowed(&self, value: &str) -> Option<char> {
        value.chars().find(|c| !self.chars.contains(c))
    }
}

impl fmt::Debug for CharacterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CharacterSet({} chars)", self.chars.len())
    }
}

/// How the suffix list is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuffixMode {
    /// Every suffix except the listed ones is accepted.
    #[default]
    Blacklist,
    /// Only the listed suffixes are accepted.
    Whitelist,
}

/// Filter on the part of a filename after its last dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixFilter {
    mode: SuffixMode,
    suffixes: BTreeSet<String>,
}

impl SuffixFilter {
    /// Create a filter. Suffixes are compared case-insensitively.
    pub fn new<I, S>(mode: SuffixMode, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            mode,
            suffixes: suffixes
                .into_iter()
                .map(|s| s.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Default blacklist: executables.
    pub fn default_blacklist() -> Self {
        Self::new(SuffixMode::Blacklist, ["exe"])
    }

    /// Default whitelist: images and archives.
    pub fn default_whitelist() -> Self {
        Self::new(
            SuffixMode::Whitelist,
            ["png", "jpg", "jpeg", "zip", "gz", "tar"],
        )
    }

    /// Check a filename's suffix.
    ///
    /// # Errors
    /// - `Error::InvalidSuffix` if the filename has no suffix, or the suffix
    ///   is blacklisted or not whitelisted
    pub fn check(&self, filename: &str) -> Result<()> {
        let (_, suffix) = filename
            .rsplit_once('.')
            .ok_or_else(|| Error::InvalidSuffix("Filename has no suffix".to_string()))?;
        let suffix = suffix.to_lowercase();

        let listed = self.suffixes.contains(&suffix);
        let accepted = match self.mode {
            SuffixMode::Blacklist => !listed,
            SuffixMode::Whitelist => listed,
        };

        if accepted {
            Ok(())
        } else {
            Err(Error::InvalidSuffix(format!(
                "Suffix '{}' is not accepted",
                suffix
            )))
        }
    }
}

impl Default for SuffixFilter {
    fn default() -> Self {
        Self::default_blacklist()
    }
}

/// Validation applied to every object before it is written.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Allowed filename characters.
    pub filename_characters: CharacterSet,
    /// Allowed group name characters.
    pub group_name_characters: CharacterSet,
    /// Suffix filter for uploaded filenames.
    pub suffix_filter: SuffixFilter,
    /// Maximum plaintext size in bytes.
    pub max_object_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            filename_characters: CharacterSet {
                chars: DEFAULT_FILENAME_CHARACTERS.chars().collect(),
            },
            group_name_characters: CharacterSet {
                chars: DEFAULT_GROUPNAME_CHARACTERS.chars().collect(),
            },
            suffix_filter: SuffixFilter::default(),
            max_object_bytes: DEFAULT_MAX_OBJECT_BYTES,
        }
    }
}

impl UploadPolicy {
    /// Validate a filename for writing.
    ///
    /// Separators and traversal are checked first, then the suffix, then the
    /// character allow-list.
    ///
    /// # Errors
    /// - `Error::InvalidAddress` on separators, traversal, the reserved
    ///   ownership filename, or a disallowed character
    /// - `Error::InvalidSuffix` if the suffix is rejected
    pub fn check_filename(&self, filename: &str) -> Result<()> {
        check_segment(filename)?;
        if filename == OWNERSHIP_FILE {
            return Err(Error::InvalidAddress(format!(
                "'{}' is a reserved filename",
                OWNERSHIP_FILE
            )));
        }
        self.suffix_filter.check(filename)?;
        if let Some(c) = self.filename_characters.first_disallowed(filename) {
            return Err(Error::InvalidAddress(format!(
                "Filename contains disallowed character {:?}",
                c
            )));
        }
        Ok(())
    }

    /// Validate a group name for creation.
    ///
    /// # Errors
    /// - `Error::InvalidAddress` on separators, traversal or a disallowed
    ///   character
    pub fn check_group_name(&self, name: &str) -> Result<()> {
        check_segment(name)?;
        if let Some(c) = self.group_name_characters.first_disallowed(name) {
            return Err(Error::InvalidAddress(format!(
                "Group name contains disallowed character {:?}",
                c
            )));
        }
        Ok(())
    }

    /// Validate a filename that is about to be read or deleted.
    ///
    /// A name the allow-list could never have accepted cannot be stored, so
    /// it is answered as absent without touching the provider.
    ///
    /// # Errors
    /// - `Error::InvalidAddress` on separators or traversal
    /// - `Error::NotFound` for the reserved ownership filename or a
    ///   disallowed character
    pub fn check_stored_filename(&self, filename: &str) -> Result<()> {
        check_segment(filename)?;
        if filename == OWNERSHIP_FILE || !self.filename_characters.allows(filename) {
            return Err(Error::NotFound(format!("File not found: {:?}", filename)));
        }
        Ok(())
    }

    /// Validate the name of a group that should already exist.
    ///
    /// # Errors
    /// - `Error::InvalidAddress` on separators or traversal
    /// - `Error::NotFound` on a disallowed character
    pub fn check_stored_group_name(&self, name: &str) -> Result<()> {
        check_segment(name)?;
        if !self.group_name_characters.allows(name) {
            return Err(Error::NotFound(format!("Group not found: {:?}", name)));
        }
        Ok(())
    }

    /// Check an object size against the limit.
    ///
    /// # Errors
    /// - `Error::TooLarge` if `len` exceeds `max_object_bytes`
    pub fn check_size(&self, len: usize) -> Result<()> {
        if len as u64 > self.max_object_bytes {
            return Err(Error::TooLarge(format!(
                "Object of {} bytes exceeds the maximum of {} bytes",
                len, self.max_object_bytes
            )));
        }
        Ok(())
    }

    /// Full validation of an upload.
    pub fn check_upload(&self, filename: &str, len: usize) -> Result<()> {
        self.check_filename(filename)?;
        self.check_size(len)
    }
}
