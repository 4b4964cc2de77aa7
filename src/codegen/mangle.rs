//! Symbol names
//!
//! Members are emitted under names derived from their owner, their own name and the
//! names of their parameter types, so overloads get distinct symbols.

const SEPARATOR: char = '_';

/// `Function_<Owner>_<Member>_<P1>_..._<Pn>`
pub fn function<'a>(
    owner: &str,
    member: &str,
    parameters: impl IntoIterator<Item = &'a str>,
) -> String {
    let mut name = format!("Function{SEPARATOR}{owner}{SEPARATOR}{member}{SEPARATOR}");
    for parameter in parameters {
        name.push_str(parameter);
        name.push(SEPARATOR);
    }
    name.pop();
    name
}
