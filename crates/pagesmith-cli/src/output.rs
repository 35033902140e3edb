use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// Print `label:` followed by one indented line per item, or `(none)`.
pub fn print_list<S: AsRef<str>>(label: &str, items: &[S]) {
    println!("{label}:");
    if items.is_empty() {
        println!("  (none)");
    }
    for item in items {
        println!("  {}", item.as_ref());
    }
}
