/// Hashing algorithm used for content addressing; also the first path segment under the root.
pub const HASH_ALGORITHM: &str = "sha256";

/// Route prefix under which the REST API serves stored objects.
pub const FILES_ROUTE_PREFIX: &str = "/api/files";
