//! Codec Tests
//!
//! Tests for command line parsing and response encoding.

use bytes::Bytes;
use mcwire::protocol::{
    encode_response, parse_command, write_response, Command, CommandType, Case, Response,
};

fn set(key: &str, flags: u32, exptime: i32, bytes: usize, noreply: bool) -> Command {
    Command::Set {
        key: key.as_bytes().to_vec(),
        flags,
        exptime,
        bytes,
        noreply,
    }
}

// =============================================================================
// Keyword Tests
// =============================================================================

#[test]
fn test_keyword_lower_and_upper() {
    assert_eq!(
        CommandType::from_keyword(b"set"),
        Some((CommandType::Set, Case::Lower))
    );
    assert_eq!(
        CommandType::from_keyword(b"GETS"),
        Some((CommandType::Gets, Case::Upper))
    );
    assert_eq!(CommandType::from_keyword(b"Set"), None);
    assert_eq!(CommandType::from_keyword(b"quit"), None);
}

#[test]
fn test_unknown_keyword() {
    assert_eq!(parse_command(b"stats\r\n"), Command::Unknown);
    assert_eq!(parse_command(b"flush_all 0\r\n"), Command::Unknown);
    assert_eq!(parse_command(b"setx k 0 0 1\r\n"), Command::Unknown);
}

#[test]
fn test_mixed_case_keyword_is_not_accepted() {
    assert_eq!(parse_command(b"Get key\r\n"), Command::Unknown);
}

#[test]
fn test_missing_crlf_is_malformed() {
    assert_eq!(parse_command(b"get key\n"), Command::Malformed);
    assert_eq!(parse_command(b"get key"), Command::Malformed);
    assert_eq!(parse_command(b"close\n"), Command::Malformed);
}

// =============================================================================
// Set Tests
// =============================================================================

#[test]
fn test_parse_set() {
    assert_eq!(parse_command(b"set key 5 100 10\r\n"), set("key", 5, 100, 10, false));
}

#[test]
fn test_parse_set_upper_case() {
    assert_eq!(parse_command(b"SET key 0 0 3\r\n"), set("key", 0, 0, 3, false));
}

#[test]
fn test_parse_set_noreply() {
    assert_eq!(parse_command(b"set key 0 0 3 noreply\r\n"), set("key", 0, 0, 3, true));
    assert_eq!(parse_command(b"SET key 0 0 3 NOREPLY\r\n"), set("key", 0, 0, 3, true));
}

#[test]
fn test_parse_set_noreply_must_match_case_family() {
    assert_eq!(parse_command(b"set key 0 0 3 NOREPLY\r\n"), Command::Malformed);
    assert_eq!(parse_command(b"SET key 0 0 3 noreply\r\n"), Command::Malformed);
}

#[test]
fn test_parse_set_wrong_field_count() {
    assert_eq!(parse_command(b"set hello\r\n"), Command::Malformed);
    assert_eq!(parse_command(b"set key 0 0\r\n"), Command::Malformed);
    assert_eq!(parse_command(b"set key 0 0 3 noreply extra\r\n"), Command::Malformed);
    assert_eq!(parse_command(b"set\r\n"), Command::Malformed);
}

#[test]
fn test_parse_set_bad_trailing_token() {
    assert_eq!(parse_command(b"set key 0 0 3 please\r\n"), Command::Malformed);
}

#[test]
fn test_parse_set_numeric_failures() {
    assert_eq!(parse_command(b"set key x 0 3\r\n"), Command::Malformed);
    assert_eq!(parse_command(b"set key 0 y 3\r\n"), Command::Malformed);
    assert_eq!(parse_command(b"set key 0 0 z\r\n"), Command::Malformed);
    // flags is a u32
    assert_eq!(parse_command(b"set key 4294967296 0 3\r\n"), Command::Malformed);
    assert_eq!(parse_command(b"set key -1 0 3\r\n"), Command::Malformed);
}

#[test]
fn test_parse_set_negative_bytes() {
    assert_eq!(parse_command(b"set key 0 0 -1\r\n"), Command::Malformed);
}

#[test]
fn test_parse_set_negative_exptime() {
    assert_eq!(parse_command(b"set key 0 -1 3\r\n"), set("key", 0, -1, 3, false));
}

#[test]
fn test_parse_set_zero_length() {
    assert_eq!(parse_command(b"set key 0 0 0\r\n"), set("key", 0, 0, 0, false));
}

#[test]
fn test_parse_set_double_space_is_malformed() {
    assert_eq!(parse_command(b"set key  0 0 3\r\n"), Command::Malformed);
}

// =============================================================================
// Get Tests
// =============================================================================

#[test]
fn test_parse_get_single() {
    assert_eq!(
        parse_command(b"get key\r\n"),
        Command::Get {
            keys: vec![b"key".to_vec()],
            multi: false
        }
    );
}

#[test]
fn test_parse_gets_single_key_uses_single_path() {
    assert_eq!(
        parse_command(b"gets key\r\n"),
        Command::Get {
            keys: vec![b"key".to_vec()],
            multi: false
        }
    );
}

#[test]
fn test_parse_get_multi() {
    assert_eq!(
        parse_command(b"gets a b c\r\n"),
        Command::Get {
            keys: vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()],
            multi: true
        }
    );
    assert_eq!(
        parse_command(b"GET a b\r\n"),
        Command::Get {
            keys: vec![b"a".to_vec(), b"b".to_vec()],
            multi: true
        }
    );
}

#[test]
fn test_parse_get_trailing_space_goes_multi() {
    assert_eq!(
        parse_command(b"get a \r\n"),
        Command::Get {
            keys: vec![b"a".to_vec()],
            multi: true
        }
    );
}

#[test]
fn test_parse_get_without_key() {
    assert_eq!(parse_command(b"get\r\n"), Command::Malformed);
    assert_eq!(parse_command(b"get \r\n"), Command::Malformed);
    assert_eq!(parse_command(b"gets  \r\n"), Command::Malformed);
}

#[test]
fn test_parse_get_key_too_long() {
    let mut line = b"get ".to_vec();
    line.extend(std::iter::repeat(b'k').take(251));
    line.extend_from_slice(b"\r\n");
    assert_eq!(parse_command(&line), Command::Malformed);

    let mut line = b"get ".to_vec();
    line.extend(std::iter::repeat(b'k').take(250));
    line.extend_from_slice(b"\r\n");
    assert!(matches!(parse_command(&line), Command::Get { .. }));
}

#[test]
fn test_parse_get_key_with_control_character() {
    assert_eq!(parse_command(b"get ke\x01y\r\n"), Command::Malformed);
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_parse_delete() {
    assert_eq!(
        parse_command(b"delete key\r\n"),
        Command::Delete {
            key: b"key".to_vec(),
            noreply: false
        }
    );
    assert_eq!(
        parse_command(b"DELETE key NOREPLY\r\n"),
        Command::Delete {
            key: b"key".to_vec(),
            noreply: true
        }
    );
}

#[test]
fn test_parse_delete_wrong_field_count() {
    assert_eq!(parse_command(b"delete\r\n"), Command::Malformed);
    assert_eq!(parse_command(b"delete key 0 noreply\r\n"), Command::Malformed);
    assert_eq!(parse_command(b"delete key 0\r\n"), Command::Malformed);
}

// =============================================================================
// Incr / Decr Tests
// =============================================================================

#[test]
fn test_parse_incr() {
    assert_eq!(
        parse_command(b"incr counter 5\r\n"),
        Command::Incr {
            key: b"counter".to_vec(),
            delta: 5,
            noreply: false
        }
    );
}

#[test]
fn test_parse_decr_noreply() {
    assert_eq!(
        parse_command(b"DECR counter 18446744073709551615 NOREPLY\r\n"),
        Command::Decr {
            key: b"counter".to_vec(),
            delta: u64::MAX,
            noreply: true
        }
    );
}

#[test]
fn test_parse_incr_failures() {
    assert_eq!(parse_command(b"incr counter\r\n"), Command::Malformed);
    assert_eq!(parse_command(b"incr counter -1\r\n"), Command::Malformed);
    assert_eq!(parse_command(b"incr counter abc\r\n"), Command::Malformed);
    assert_eq!(parse_command(b"incr counter 1 2 3\r\n"), Command::Malformed);
    assert_eq!(parse_command(b"incr counter 1 yes\r\n"), Command::Malformed);
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_parse_close() {
    assert_eq!(parse_command(b"close\r\n"), Command::Close);
    assert_eq!(parse_command(b"CLOSE\r\n"), Command::Close);
    assert_eq!(parse_command(b"close now\r\n"), Command::Malformed);
}

#[test]
fn test_command_noreply_accessor() {
    assert!(parse_command(b"incr k 1 noreply\r\n").noreply());
    assert!(!parse_command(b"get k\r\n").noreply());
    assert!(!Command::Malformed.noreply());
}

// =============================================================================
// Response Encoding Tests
// =============================================================================

#[test]
fn test_encode_tokens() {
    assert_eq!(encode_response(&Response::Stored), b"STORED\r\n");
    assert_eq!(encode_response(&Response::NotStored), b"NOT_STORED\r\n");
    assert_eq!(encode_response(&Response::Exists), b"EXISTS\r\n");
    assert_eq!(encode_response(&Response::NotFound), b"NOT_FOUND\r\n");
    assert_eq!(encode_response(&Response::Deleted), b"DELETED\r\n");
    assert_eq!(encode_response(&Response::End), b"END\r\n");
    assert_eq!(encode_response(&Response::Error), b"ERROR\r\n");
    assert_eq!(encode_response(&Response::Touched), b"TOUCHED\r\n");
}

#[test]
fn test_encode_value_block() {
    let response = Response::value(b"key".to_vec(), Bytes::from_static(b"value"));
    assert_eq!(encode_response(&response), b"VALUE key 0 5\r\nvalue\r\n");
}

#[test]
fn test_encode_value_block_binary_payload() {
    let payload: Vec<u8> = vec![0x00, b'\r', b'\n', 0xFF];
    let response = Response::value(b"bin".to_vec(), Bytes::from(payload));
    assert_eq!(
        encode_response(&response),
        b"VALUE bin 0 4\r\n\x00\r\n\xff\r\n".to_vec()
    );
}

#[test]
fn test_encode_numeric() {
    assert_eq!(encode_response(&Response::Numeric(0)), b"0\r\n");
    assert_eq!(
        encode_response(&Response::Numeric(u64::MAX)),
        b"18446744073709551615\r\n"
    );
}

#[test]
fn test_write_response_matches_encode() {
    let responses = [
        Response::value(b"a".to_vec(), Bytes::from_static(b"1")),
        Response::value(b"b".to_vec(), Bytes::from_static(b"22")),
        Response::End,
    ];

    let mut written = Vec::new();
    for response in &responses {
        write_response(&mut written, response).unwrap();
    }

    let encoded: Vec<u8> = responses.iter().flat_map(encode_response).collect();
    assert_eq!(written, encoded);
    assert_eq!(written, b"VALUE a 0 1\r\n1\r\nVALUE b 0 2\r\n22\r\nEND\r\n");
}
