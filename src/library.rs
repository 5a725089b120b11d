//! # Clip Library Module
//!
//! Describes the candidate audio clips the engine can audition. Clips are
//! grouped into named style buckets (for example `latin`, `rave`, `nineties`),
//! and inside each bucket by [`Role`]: beats, leads and melodies.
//!
//! Style names carry no meaning to the engine. Only two things matter:
//! - the order styles are declared in, which is the beat evaluation order
//! - which style a winning beat came from, which picks the lead bucket
//!
//! ## File Format
//!
//! Libraries are stored as JSON:
//!
//! ```json
//! {
//!   "styles": [
//!     { "name": "latin", "beats": ["latin_beat_1"], "leads": ["latin_lead_1"], "melodies": [] },
//!     { "name": "rave",  "beats": ["rave_beat_1"],  "leads": ["rave_lead_1"] }
//!   ]
//! }
//! ```

use anyhow::{bail, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Opaque handle to an audio asset.
///
/// Two clips are the same clip iff their names are equal; the library
/// guarantees names are unique across every bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Clip(String);

impl Clip {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Track role inside a style bucket. Each role plays on its own output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Beat,
    Lead,
    Melody,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Beat, Role::Lead, Role::Melody];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Beat => "beat",
            Role::Lead => "lead",
            Role::Melody => "melody",
        };
        f.write_str(name)
    }
}

/// A named musical style and its clips, one list per role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleBucket {
    pub name: String,
    #[serde(default)]
    pub beats: Vec<Clip>,
    #[serde(default)]
    pub leads: Vec<Clip>,
    #[serde(default)]
    pub melodies: Vec<Clip>,
}

impl StyleBucket {
    /// Clips of `role`, in declaration order.
    #[must_use]
    pub fn clips(&self, role: Role) -> &[Clip] {
        match role {
            Role::Beat => &self.beats,
            Role::Lead => &self.leads,
            Role::Melody => &self.melodies,
        }
    }
}

/// Validated set of style buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClipLibrary {
    styles: Vec<StyleBucket>,
}

#[derive(Deserialize)]
struct LibraryFile {
    styles: Vec<StyleBucket>,
}

impl ClipLibrary {
    /// Builds a library, enforcing that style names are unique and that every
    /// clip sits in exactly one (role, style) bucket.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending style or clip when either
    /// uniqueness rule is broken.
    pub fn new(styles: Vec<StyleBucket>) -> Result<Self> {
        let mut style_names: Vec<&str> = Vec::with_capacity(styles.len());
        let mut owners: HashMap<&Clip, (Role, &str)> = HashMap::new();

        for style in &styles {
            if style_names.contains(&style.name.as_str()) {
                bail!("Style `{}` is declared more than once", style.name);
            }
            style_names.push(&style.name);

            for role in Role::ALL {
                for clip in style.clips(role) {
                    if let Some((other_role, other_style)) = owners.insert(clip, (role, style.name.as_str())) {
                        bail!(
                            "Clip `{clip}` appears as {role} in `{}` and as {other_role} in `{other_style}`; \
                             a clip may belong to only one bucket",
                            style.name
                        );
                    }
                }
            }
        }

        debug!("Built clip library with {} styles and {} clips", styles.len(), owners.len());
        Ok(Self { styles })
    }

    /// Loads and validates a JSON library file.
    ///
    /// # Arguments
    ///
    /// * `path` - JSON file with a `styles` array; each style names its
    ///   `beats`, `leads` and optional `melodies`
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed, or when a clip is listed
    /// in more than one place.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use moodmix::library::{ClipLibrary, Role};
    /// use std::path::Path;
    ///
    /// let library = ClipLibrary::load(Path::new("library.json"))?;
    /// println!("{} beats", library.clip_count(Role::Beat));
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read clip library at {}", path.display()))?;
        let file: LibraryFile = serde_json::from_str(&raw)
            .with_context(|| format!("Clip library {} is not valid JSON", path.display()))?;
        Self::new(file.styles)
            .with_context(|| format!("Clip library {} is inconsistent", path.display()))
    }

    /// Platform data location used when no library path is given.
    pub fn default_path() -> Result<PathBuf> {
        Ok(crate::config::get_data_dir()?.join("library.json"))
    }

    /// Styles in declaration order.
    #[must_use]
    pub fn styles(&self) -> &[StyleBucket] {
        &self.styles
    }

    #[must_use]
    pub fn style(&self, name: &str) -> Option<&StyleBucket> {
        self.styles.iter().find(|style| style.name == name)
    }

    /// The style whose `role` bucket holds `clip`.
    #[must_use]
    pub fn style_of(&self, role: Role, clip: &Clip) -> Option<&StyleBucket> {
        self.styles
            .iter()
            .find(|style| style.clips(role).contains(clip))
    }

    /// Total number of clips declared for `role` across every style.
    #[must_use]
    pub fn clip_count(&self, role: Role) -> usize {
        self.styles.iter().map(|style| style.clips(role).len()).sum()
    }
}
