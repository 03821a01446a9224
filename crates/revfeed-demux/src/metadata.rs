use crate::error::DecodeError;

/// Column names of a metadata line, in wire order.
pub const METADATA_HEADER: [&str; 9] = [
    "REVISION_ID",
    "REVISION_SESSION_ID",
    "USER_COUNTRY_CODE",
    "USER_CONTINENT_CODE",
    "USER_TIME_ZONE",
    "USER_REGION_CODE",
    "USER_CITY_NAME",
    "USER_COUNTY_NAME",
    "REVISION_TAGS",
];

/// Context the data server sends ahead of each revision.
///
/// Every field is kept as the server sent it; absent values are empty
/// strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub revision_id: String,
    pub session_id: String,
    pub country_code: String,
    pub continent_code: String,
    pub time_zone: String,
    pub region_code: String,
    pub city_name: String,
    pub county_name: String,
    pub revision_tags: String,
}

impl MetadataRecord {
    /// Decode one metadata frame: a single RFC 4180 line with exactly the
    /// columns of [`METADATA_HEADER`]. One trailing line break is allowed;
    /// a second record is not.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let line = std::str::from_utf8(bytes)?;
        if line.trim_end_matches(&['\r', '\n'][..]).is_empty() {
            return Err(DecodeError::Empty);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes());
        let mut records = reader.records();
        let record = records.next().ok_or(DecodeError::Empty)??;
        if records.next().is_some() {
            return Err(DecodeError::TrailingRecords);
        }

        if record.len() != METADATA_HEADER.len() {
            return Err(DecodeError::FieldCount {
                expected: METADATA_HEADER.len(),
                found: record.len(),
            });
        }

        let field = |i: usize| record[i].to_string();
        Ok(Self {
            revision_id: field(0),
            session_id: field(1),
            country_code: field(2),
            continent_code: field(3),
            time_zone: field(4),
            region_code: field(5),
            city_name: field(6),
            county_name: field(7),
            revision_tags: field(8),
        })
    }

    /// Look a field up by its column name.
    pub fn get(&self, column: &str) -> Option<&str> {
        let index = METADATA_HEADER.iter().position(|name| *name == column)?;
        Some(self.fields()[index])
    }

    /// All fields in column order.
    pub fn fields(&self) -> [&str; 9] {
        [
            self.revision_id.as_str(),
            self.session_id.as_str(),
            self.country_code.as_str(),
            self.continent_code.as_str(),
            self.time_zone.as_str(),
            self.region_code.as_str(),
            self.city_name.as_str(),
            self.county_name.as_str(),
            self.revision_tags.as_str(),
        ]
    }
}
