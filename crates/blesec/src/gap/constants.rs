// Address types
pub const PUBLIC_DEVICE_ADDRESS: u8 = 0x00;
pub const RANDOM_DEVICE_ADDRESS: u8 = 0x01;
pub const PUBLIC_IDENTITY_ADDRESS: u8 = 0x02;
pub const RANDOM_STATIC_IDENTITY_ADDRESS: u8 = 0x03;

// Random address sub-types, encoded in the two most significant bits
pub const RANDOM_ADDRESS_TYPE_MASK: u8 = 0xC0;
pub const NON_RESOLVABLE_PRIVATE_ADDRESS_BITS: u8 = 0x00;
pub const RESOLVABLE_PRIVATE_ADDRESS_BITS: u8 = 0x40;
pub const STATIC_RANDOM_ADDRESS_BITS: u8 = 0xC0;
