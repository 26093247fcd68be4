//! Canonical book codes.
//!
//! Maps the 3-character USFM identifiers (`GEN`, `1CO`, ...) to the internal
//! slugs (`genesis`, `1_corinthians`) and display names used downstream.
//! Lookups by code are case-insensitive.

/// One entry of the book table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookInfo {
    pub code: &'static str,
    pub slug: &'static str,
    pub name: &'static str,
}

const fn book(code: &'static str, slug: &'static str, name: &'static str) -> BookInfo {
    BookInfo { code, slug, name }
}

/// All 66 books in canonical order.
pub static BOOKS: [BookInfo; 66] = [
    // Old Testament
    book("GEN", "genesis", "Genesis"),
    book("EXO", "exodus", "Exodus"),
    book("LEV", "leviticus", "Leviticus"),
    book("NUM", "numbers", "Numbers"),
    book("DEU", "deuteronomy", "Deuteronomy"),
    book("JOS", "joshua", "Joshua"),
    book("JDG", "judges", "Judges"),
    book("RUT", "ruth", "Ruth"),
    book("1SA", "1_samuel", "1 Samuel"),
    book("2SA", "2_samuel", "2 Samuel"),
    book("1KI", "1_kings", "1 Kings"),
    book("2KI", "2_kings", "2 Kings"),
    book("1CH", "1_chronicles", "1 Chronicles"),
    book("2CH", "2_chronicles", "2 Chronicles"),
    book("EZR", "ezra", "Ezra"),
    book("NEH", "nehemiah", "Nehemiah"),
    book("EST", "esther", "Esther"),
    book("JOB", "job", "Job"),
    book("PSA", "psalms", "Psalms"),
    book("PRO", "proverbs", "Proverbs"),
    book("ECC", "ecclesiastes", "Ecclesiastes"),
    book("SNG", "song_of_solomon", "Song of Solomon"),
    book("ISA", "isaiah", "Isaiah"),
    book("JER", "jeremiah", "Jeremiah"),
    book("LAM", "lamentations", "Lamentations"),
    book("EZK", "ezekiel", "Ezekiel"),
    book("DAN", "daniel", "Daniel"),
    book("HOS", "hosea", "Hosea"),
    book("JOL", "joel", "Joel"),
    book("AMO", "amos", "Amos"),
    book("OBA", "obadiah", "Obadiah"),
    book("JON", "jonah", "Jonah"),
    book("MIC", "micah", "Micah"),
    book("NAM", "nahum", "Nahum"),
    book("HAB", "habakkuk", "Habakkuk"),
    book("ZEP", "zephaniah", "Zephaniah"),
    book("HAG", "haggai", "Haggai"),
    book("ZEC", "zechariah", "Zechariah"),
    book("MAL", "malachi", "Malachi"),
    // New Testament
    book("MAT", "matthew", "Matthew"),
    book("MRK", "mark", "Mark"),
    book("LUK", "luke", "Luke"),
    book("JHN", "john", "John"),
    book("ACT", "acts", "Acts"),
    book("ROM", "romans", "Romans"),
    book("1CO", "1_corinthians", "1 Corinthians"),
    book("2CO", "2_corinthians", "2 Corinthians"),
    book("GAL", "galatians", "Galatians"),
    book("EPH", "ephesians", "Ephesians"),
    book("PHP", "philippians", "Philippians"),
    book("COL", "colossians", "Colossians"),
    book("1TH", "1_thessalonians", "1 Thessalonians"),
    book("2TH", "2_thessalonians", "2 Thessalonians"),
    book("1TI", "1_timothy", "1 Timothy"),
    book("2TI", "2_timothy", "2 Timothy"),
    book("TIT", "titus", "Titus"),
    book("PHM", "philemon", "Philemon"),
    book("HEB", "hebrews", "Hebrews"),
    book("JAS", "james", "James"),
    book("1PE", "1_peter", "1 Peter"),
    book("2PE", "2_peter", "2 Peter"),
    book("1JN", "1_john", "1 John"),
    book("2JN", "2_john", "2 John"),
    book("3JN", "3_john", "3 John"),
    book("JUD", "jude", "Jude"),
    book("REV", "revelation", "Revelation"),
];

/// Find the table entry for a code, ignoring case.
#[must_use]
pub fn lookup(code: &str) -> Option<&'static BookInfo> {
    BOOKS.iter().find(|b| b.code.eq_ignore_ascii_case(code.trim()))
}

#[must_use]
pub fn code_to_slug(code: &str) -> Option<&'static str> {
    lookup(code).map(|b| b.slug)
}

#[must_use]
pub fn code_to_name(code: &str) -> Option<&'static str> {
    lookup(code).map(|b| b.name)
}

#[must_use]
pub fn is_valid_code(code: &str) -> bool {
    lookup(code).is_some()
}

/// Reverse lookup: slug (case-insensitive) to canonical code.
#[must_use]
pub fn slug_to_code(slug: &str) -> Option<&'static str> {
    BOOKS
        .iter()
        .find(|b| b.slug.eq_ignore_ascii_case(slug.trim()))
        .map(|b| b.code)
}

/// Display name (exact match) to slug.
#[must_use]
pub fn name_to_slug(name: &str) -> Option<&'static str> {
    BOOKS.iter().find(|b| b.name == name).map(|b| b.slug)
}

/// All codes in canonical order.
#[must_use]
pub fn all_codes() -> Vec<&'static str> {
    BOOKS.iter().map(|b| b.code).collect()
}

/// All slugs in canonical order.
#[must_use]
pub fn all_slugs() -> Vec<&'static str> {
    BOOKS.iter().map(|b| b.slug).collect()
}
