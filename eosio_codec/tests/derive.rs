use eosio_codec::{
    from_bytes, name::Name, to_bytes, types::Asset, CodecError, Deserial, Serial, Serialize, VarUint32,
};

#[derive(Debug, PartialEq, Serial, Deserial)]
struct Transfer {
    from:     Name,
    to:       Name,
    quantity: Asset,
    memo:     String,
}

#[derive(Debug, PartialEq, Serial, Deserial)]
struct Extended {
    id:     u32,
    #[eosio(skip)]
    cached: u64,
    #[eosio(optional)]
    label:  Option<String>,
    #[eosio(binary_extension)]
    weight: Option<u16>,
}

#[derive(Debug, PartialEq, Serial, Deserial)]
enum Authority {
    Key(u8),
    Account { name: Name, weight: u16 },
    Wait,
}

#[derive(Debug, PartialEq, Serial, Deserial)]
struct Wrapper(VarUint32, Vec<u8>);

#[derive(Debug, PartialEq, Serialize)]
struct Both {
    a: u8,
    b: Option<Name>,
}

#[test]
fn test_struct_fields_in_declaration_order() {
    let transfer = Transfer {
        from:     "alice".into(),
        to:       "bob".into(),
        quantity: "1.0000 EOS".parse().unwrap(),
        memo:     "hi".into(),
    };
    let bytes = to_bytes(&transfer);
    let mut expected = to_bytes(&Name::from("alice"));
    expected.extend(to_bytes(&Name::from("bob")));
    expected.extend(to_bytes(&transfer.quantity));
    expected.extend([2, b'h', b'i']);
    assert_eq!(bytes, expected);
    assert_eq!(from_bytes::<Transfer>(&bytes).unwrap(), transfer);
}

#[test]
fn test_field_attributes() {
    let value = Extended {
        id:     7,
        cached: 99,
        label:  None,
        weight: None,
    };
    let bytes = to_bytes(&value);
    assert_eq!(bytes, vec![7, 0, 0, 0, 0], "Skipped and absent extension fields write nothing.");
    let decoded = from_bytes::<Extended>(&bytes).unwrap();
    assert_eq!(decoded.cached, 0, "Skipped fields decode to their default.");
    assert_eq!(decoded.weight, None);

    let full = Extended {
        id:     7,
        cached: 0,
        label:  Some("x".into()),
        weight: Some(2),
    };
    let bytes = to_bytes(&full);
    assert_eq!(bytes, vec![7, 0, 0, 0, 1, 1, b'x', 2, 0]);
    assert_eq!(from_bytes::<Extended>(&bytes).unwrap(), full);
}

#[test]
fn test_enum_tag() {
    assert_eq!(to_bytes(&Authority::Key(5)), vec![0, 5]);
    assert_eq!(to_bytes(&Authority::Wait), vec![2]);
    let account = Authority::Account {
        name:   "eosio".into(),
        weight: 1,
    };
    let bytes = to_bytes(&account);
    assert_eq!(bytes[0], 1);
    assert_eq!(from_bytes::<Authority>(&bytes).unwrap(), account);
    assert!(matches!(from_bytes::<Authority>(&[3]), Err(CodecError::InvalidValue(_))));
}

#[test]
fn test_tuple_struct() {
    let value = Wrapper(VarUint32(300), vec![1, 2]);
    let bytes = to_bytes(&value);
    assert_eq!(bytes, vec![0xac, 0x02, 2, 1, 2]);
    assert_eq!(from_bytes::<Wrapper>(&bytes).unwrap(), value);
}

#[test]
fn test_decode_breadcrumb() {
    let mut bytes = to_bytes(&Name::from("alice"));
    bytes.extend(to_bytes(&Name::from("bob")));
    bytes.extend([1, 0, 0]);
    let err = from_bytes::<Transfer>(&bytes).unwrap_err();
    assert_eq!(err.path(), vec!["decode field [quantity] of type [Asset]"]);
    assert!(matches!(err.root(), CodecError::InsufficientData { .. }));
}

#[test]
fn test_serialize_derives_both() {
    let value = Both {
        a: 1,
        b: Some("eosio".into()),
    };
    let bytes = to_bytes(&value);
    assert_eq!(bytes.len(), 1 + 1 + 8);
    assert_eq!(from_bytes::<Both>(&bytes).unwrap(), value);
}
