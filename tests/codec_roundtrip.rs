//! Round-trips and decode failures exercised through the public codec
//! entry points (`decode_message`/`encode_message`) rather than through
//! an individual option's own unit tests.

use dhcv6d::message::{decode_message, encode_message, Message, Solicit};
use dhcv6d::options::ia::IaNa;
use dhcv6d::options::{DhcpOption, DhcpOptions, OptionCode};
use dhcv6d::Encodable;

#[test]
fn an_option_this_build_does_not_recognize_round_trips_byte_identical() {
    let msg = Message::Solicit(Solicit {
        transaction_id: 0x42_4242,
        opts: DhcpOptions(vec![DhcpOption::Unknown(dhcv6d::options::UnknownOption {
            code: 0xfffe,
            data: vec![0xde, 0xad, 0xbe, 0xef],
        })]),
    });

    let encoded = encode_message(&msg).expect("unknown option encodes");
    let (decoded, degraded) = decode_message(&encoded).expect("unknown option decodes back");

    assert!(!degraded);
    assert_eq!(decoded, msg);

    let re_encoded = encode_message(&decoded).expect("decoded message re-encodes");
    assert_eq!(re_encoded, encoded);
}

#[test]
fn a_message_carrying_a_truncated_ia_na_fails_to_decode() {
    let ia = IaNa {
        id: 7,
        t1: 0,
        t2: 0,
        opts: DhcpOptions::new(),
    };
    let mut ia_bytes = ia.to_vec().expect("untruncated IA_NA encodes");
    // claim a longer body than is actually present, then drop the
    // trailing bytes that would have backed that claim.
    let declared_len_hi_idx = 2;
    ia_bytes[declared_len_hi_idx] = 0;
    ia_bytes[declared_len_hi_idx + 1] = 40;
    ia_bytes.truncate(ia_bytes.len() - 4);

    let mut message_bytes = vec![1, 0, 0, 1]; // Solicit, transaction_id = 1
    message_bytes.extend_from_slice(&ia_bytes);

    assert!(decode_message(&message_bytes).is_err());
}

#[test]
fn option_code_round_trips_through_its_wire_form() {
    assert_eq!(u16::from(OptionCode::IaNa), 3);
    assert_eq!(OptionCode::from(3), OptionCode::IaNa);
    assert_eq!(OptionCode::from(0xfffe), OptionCode::Unknown(0xfffe));
}
