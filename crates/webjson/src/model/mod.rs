mod listing;
mod mapping_array;

pub use listing::Listing;
pub use mapping_array::MappingArray;
