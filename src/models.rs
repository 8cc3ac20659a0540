use chrono::Utc;

/// One envelope in the relay log.
///
/// `kind` is the raw wire value of `mp.EnvelopeKind`; the relay never
/// interprets it. `dest` is a rank or [`relay_types::ALL_RANKS`].
#[derive(Debug, Clone)]
pub struct Record {
    pub ordinal: u64,
    pub session: String,
    pub kind: i32,
    pub source: u32,
    pub dest: i32,
    pub tag: u64,
    pub payload: Vec<u8>,
    pub timestamp: i64,
}

impl Record {
    pub fn new(session: String, kind: i32, source: u32, dest: i32, tag: u64, payload: Vec<u8>) -> Self {
        Self {
            ordinal: 0,
            session,
            kind,
            source,
            dest,
            tag,
            payload,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Whether a subscriber with `rank` should receive this record.
    pub fn is_addressed_to(&self, rank: u32) -> bool {
        if self.dest == relay_types::ALL_RANKS {
            self.source != rank
        } else {
            self.dest >= 0 && self.dest as u32 == rank
        }
    }
}
