//! Wire types shared by the relay server and its rank clients.

pub mod mp {
    tonic::include_proto!("mp");
}

/// Destination value addressing every rank of a session except the source.
pub const ALL_RANKS: i32 = -1;
