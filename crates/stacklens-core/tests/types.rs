//! Tests for backend-agnostic types

use stacklens_core::types::{Address, SymbolRecord};

#[test]
fn test_address_from_usize()
{
    let address = Address::from(0x1000);
    assert_eq!(address.value(), 0x1000);
}

#[test]
fn test_address_to_usize()
{
    let value: usize = Address::new(0x2000).into();
    assert_eq!(value, 0x2000);
}

#[test]
fn test_address_pointer_round_trip()
{
    let value = 42u32;
    let ptr = std::ptr::addr_of!(value).cast::<std::ffi::c_void>();
    assert_eq!(Address::from_ptr(ptr).as_ptr(), ptr);
}

#[test]
fn test_address_display_is_zero_padded()
{
    assert_eq!(Address::new(0xdead).to_string(), "0x000000000000dead");
    assert_eq!(format!("{:x}", Address::new(0xdead)), "dead");
}

#[test]
fn test_address_lookup_pc()
{
    assert_eq!(Address::new(0x1001).lookup_pc(), 0x1000);
    // Saturates instead of wrapping to the top of the address space
    assert_eq!(Address::new(0).lookup_pc(), 0);
}

#[test]
fn test_symbol_record_display_with_location()
{
    let record = SymbolRecord {
        source_file: Some("src/main.rs".to_string()),
        line: Some(42),
        function_name: "app::main".to_string(),
        address: Address::new(0x1000),
    };
    assert_eq!(record.to_string(), "app::main (src/main.rs:42)");
}

#[test]
fn test_symbol_record_display_file_only()
{
    let record = SymbolRecord {
        source_file: Some("src/main.rs".to_string()),
        line: None,
        function_name: "app::main".to_string(),
        address: Address::new(0x1000),
    };
    assert_eq!(record.to_string(), "app::main (src/main.rs)");
}

#[test]
fn test_symbol_record_display_name_only()
{
    let record = SymbolRecord::named(Address::new(0x1000), "app::main");
    assert_eq!(record.to_string(), "app::main");
    assert!(!record.is_unknown());
}

#[test]
fn test_symbol_record_display_unknown()
{
    let record = SymbolRecord::unknown(Address::new(0x1000));
    assert!(record.is_unknown());
    assert_eq!(record.to_string(), "<unknown>@0x0000000000001000");
}
