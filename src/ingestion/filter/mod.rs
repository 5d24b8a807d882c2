//! Software acceptance filter: decides which received frames reach the
//! application. Pure functions over a small fixed-capacity identifier set.
//!
//! The set holds at most [`MAX_ACCEPTED_IDS`] entries and is scanned linearly;
//! at that size a scan beats any hashed structure.
use crate::error::ValidationError;
use crate::transport::frame::Frame;

/// Capacity of the accepted-ID set.
pub const MAX_ACCEPTED_IDS: usize = 5;

//==================================================================================FILTER_MODE
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterMode {
    /// Accept every frame.
    #[default]
    Monitoring,
    /// Accept only frames listed in the accepted-ID set.
    Specific,
}

impl FilterMode {
    /// Name used by the upload protocol and the configuration summary.
    pub const fn as_str(self) -> &'static str {
        match self {
            FilterMode::Monitoring => "monitoring",
            FilterMode::Specific => "specific",
        }
    }
}

//==================================================================================ACCEPTED_IDS
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Ordered identifier set (insertion order = scan order). Unused slots are
/// always zero, so two sets with the same entries compare and encode equal.
pub struct AcceptedIds {
    ids: [u32; MAX_ACCEPTED_IDS],
    len: u8,
}

impl AcceptedIds {
    /// Empty set.
    pub const fn new() -> Self {
        Self {
            ids: [0; MAX_ACCEPTED_IDS],
            len: 0,
        }
    }

    /// Copy `ids` into a new set. Fails when more than five entries are given.
    /// Range and duplicate checks are left to [`FilterConfig::validate`].
    pub fn from_slice(ids: &[u32]) -> Result<Self, ValidationError> {
        if ids.len() > MAX_ACCEPTED_IDS {
            return Err(ValidationError::TooManyIds { count: ids.len() });
        }
        let mut set = Self::new();
        set.ids[..ids.len()].copy_from_slice(ids);
        set.len = ids.len() as u8;
        Ok(set)
    }

    /// Append one identifier.
    pub fn push(&mut self, id: u32) -> Result<(), ValidationError> {
        let len = self.len();
        if len >= MAX_ACCEPTED_IDS {
            return Err(ValidationError::TooManyIds { count: len + 1 });
        }
        self.ids[len] = id;
        self.len += 1;
        Ok(())
    }

    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.ids[..self.len()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.len as usize).min(MAX_ACCEPTED_IDS)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Linear scan for `id`.
    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.as_slice().iter().any(|&accepted| accepted == id)
    }
}

//==================================================================================FILTER_CONFIG
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Complete software filter parameters.
pub struct FilterConfig {
    pub mode: FilterMode,
    pub ids: AcceptedIds,
    /// Frame format shared by every accepted identifier.
    pub extended: bool,
}

impl FilterConfig {
    /// Accept-all configuration.
    pub const fn monitoring() -> Self {
        Self {
            mode: FilterMode::Monitoring,
            ids: AcceptedIds::new(),
            extended: false,
        }
    }

    /// Specific-mode configuration over `ids`. Range and duplicates are not
    /// checked here; see [`FilterConfig::validate`].
    pub fn specific(ids: &[u32], extended: bool) -> Result<Self, ValidationError> {
        Ok(Self {
            mode: FilterMode::Specific,
            ids: AcceptedIds::from_slice(ids)?,
            extended,
        })
    }

    /// Check the filter invariants. Monitoring mode is always valid; Specific
    /// mode needs 1-5 distinct identifiers within the range of the format.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.mode == FilterMode::Monitoring {
            return Ok(());
        }

        let ids = self.ids.as_slice();
        if ids.is_empty() {
            return Err(ValidationError::NoIds);
        }

        let max = Frame::max_id(self.extended);
        for (index, &id) in ids.iter().enumerate() {
            if id > max {
                return Err(ValidationError::IdOutOfRange { index, id, max });
            }
        }

        for (index, &id) in ids.iter().enumerate() {
            if ids[index + 1..].contains(&id) {
                return Err(ValidationError::DuplicateId { id });
            }
        }

        Ok(())
    }

    /// Shorthand for [`accept`].
    #[inline]
    pub fn accepts(&self, frame: &Frame) -> bool {
        accept(frame, self)
    }
}

//==================================================================================ACCEPT
/// Acceptance decision: `true` in monitoring mode, otherwise the frame format
/// must match and its identifier must be in the set.
#[inline]
pub fn accept(frame: &Frame, config: &FilterConfig) -> bool {
    match config.mode {
        FilterMode::Monitoring => true,
        FilterMode::Specific => {
            frame.extended == config.extended && config.ids.contains(frame.id)
        }
    }
}
