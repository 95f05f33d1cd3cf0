//! Curated source lists.

/// Recent Jerome Powell speeches on the Federal Reserve website, newest first.
pub const POWELL_SPEECHES: &[&str] = &[
    "https://www.federalreserve.gov/newsevents/speech/powell20241218a.htm",
    "https://www.federalreserve.gov/newsevents/speech/powell20241204a.htm",
    "https://www.federalreserve.gov/newsevents/speech/powell20241114a.htm",
    "https://www.federalreserve.gov/newsevents/speech/powell20241107a.htm",
    "https://www.federalreserve.gov/newsevents/speech/powell20240930a.htm",
    "https://www.federalreserve.gov/newsevents/speech/powell20240826a.htm",
    "https://www.federalreserve.gov/newsevents/speech/powell20240731a.htm",
    "https://www.federalreserve.gov/newsevents/speech/powell20240612a.htm",
    "https://www.federalreserve.gov/newsevents/speech/powell20240501a.htm",
    "https://www.federalreserve.gov/newsevents/speech/powell20240320a.htm",
    "https://www.federalreserve.gov/newsevents/speech/powell20240131a.htm",
    "https://www.federalreserve.gov/newsevents/speech/powell20231213a.htm",
    "https://www.federalreserve.gov/newsevents/speech/powell20231201a.htm",
    "https://www.federalreserve.gov/newsevents/speech/powell20231109a.htm",
    "https://www.federalreserve.gov/newsevents/speech/powell20231019a.htm",
];
