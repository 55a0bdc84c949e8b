use proc_macro::TokenStream;

mod record;

/// Derives `Model` and `Record` for a struct with named fields.
///
/// `#[db(table = "name")]` on the struct names its table. `#[db(column = "name")]`
/// maps a `pub` field to a column and `#[db(skip)]` leaves it out.
#[proc_macro_derive(Record, attributes(db))]
pub fn record_derive(input: TokenStream) -> TokenStream {
    record::record_derive_impl(input)
}
