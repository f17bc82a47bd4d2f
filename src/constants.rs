//! Provider names and fixed markers shared across adapters.
//!
//! Base URLs here are only defaults; `Config` can point each adapter elsewhere.

// Provider names (used in logs and errors)
pub const TMDB_PROVIDER: &str = "tmdb";
pub const IMDB_PROVIDER: &str = "imdb";
pub const ROTTEN_TOMATOES_PROVIDER: &str = "rotten_tomatoes";

pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const IMDB_BASE_URL: &str = "https://www.imdb.com";
pub const ROTTEN_TOMATOES_BASE_URL: &str = "https://www.rottentomatoes.com";
pub const ROTTEN_TOMATOES_SEARCH_PATH: &str = "/api/private/v2.0/search";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/81.0.4044.138 Safari/537.36";

// TMDB reports "The resource you requested could not be found." with this code
pub const TMDB_NOT_FOUND_STATUS: i64 = 34;

// Embedded-data markers
pub const LD_JSON_OPEN: &str = r#"<script type="application/ld+json">"#;
pub const LD_JSON_CLOSE: &str = "</script>";
pub const RT_SCORE_INFO_MARKER: &str = "root.RottenTomatoes.context.scoreInfo = ";
pub const RT_RESULT_MARKER: &str = "root.RottenTomatoes.context.result = ";

// Search placeholders Rotten Tomatoes mixes into results
pub const RT_NULL_MOVIE_URL: &str = "/m/null";
pub const RT_NULL_SERIES_URL: &str = "/tv/null";

pub const TRAILER_VIDEO_TYPE: &str = "Trailer";

/// Genre labels renamed to their short form after splitting.
pub const GENRE_ALIASES: &[(&str, &str)] = &[("Science Fiction", "Sci-Fi")];

/// Conjunction used by compound labels such as "Action & Adventure".
pub const GENRE_CONJUNCTION: &str = " & ";

pub const HEADERS_FILE_NAME: &str = "_headers";
pub const HEADERS_FILE_CONTENT: &str = "/*\n  Access-Control-Allow-Origin: *";
