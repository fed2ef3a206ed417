//! URL correspondence between the old and the new site.
//!
//! Three layers:
//! - `normalize`: canonical URL form used for equality lookups
//! - `similarity`: Levenshtein-based string and path similarity
//! - `resolver`: classification of every URL into matched / redirected /
//!   missing / new-only, plus path-prefix rename inference in `patterns`

mod normalize;
mod patterns;
mod resolver;
mod similarity;

pub use normalize::normalize;
pub use patterns::{detect_pattern_renames, PatternRename};
pub use resolver::{
    resolve_correspondence, CorrespondenceReport, CorrespondenceSummary, MatchType, MatchedUrl,
    MissingUrl, NewOnlyUrl, NewUrlKind,
};
pub use similarity::{path_similarity, similarity};
