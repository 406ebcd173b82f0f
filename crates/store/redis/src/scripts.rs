/// Lua script for an atomic conditional write (`SET NX` with optional `PX`).
///
/// KEYS\[1\] = the key
/// ARGV\[1\] = value to set
/// ARGV\[2\] = TTL in milliseconds, at least 1 (0 means no expiry)
///
/// Returns 1 if the key was created, 0 if it already existed.
pub const SET_IF_ABSENT: &str = r"
local ttl = tonumber(ARGV[2])
local ok
if ttl > 0 then
    ok = redis.call('SET', KEYS[1], ARGV[1], 'NX', 'PX', ttl)
else
    ok = redis.call('SET', KEYS[1], ARGV[1], 'NX')
end
if ok then
    return 1
end
return 0
";

/// Lua script for deleting a key only while it holds an expected value.
///
/// KEYS\[1\] = the key
/// ARGV\[1\] = expected value (e.g. a lock owner token)
///
/// Returns 1 if deleted, 0 if missing or holding another value.
pub const DELETE_IF_EQUALS: &str = r"
local current = redis.call('GET', KEYS[1])
if current == ARGV[1] then
    redis.call('DEL', KEYS[1])
    return 1
end
return 0
";
