use blade_core::exec::default_registry;

use super::exit_codes;

pub fn run() -> anyhow::Result<i32> {
    let registry = default_registry();
    let mut s = String::new();
    for spec in registry.specs() {
        s.push_str(&format!("{}\t{}\n", spec.name(), spec.long_desc()));
        for action in spec.actions() {
            let aliases = action.aliases();
            if aliases.is_empty() {
                s.push_str(&format!("  {}\t{}\n", action.name(), action.short_desc()));
            } else {
                s.push_str(&format!(
                    "  {} ({})\t{}\n",
                    action.name(),
                    aliases.join(", "),
                    action.short_desc()
                ));
            }
        }
        for flag in spec.flags() {
            let req = if flag.required { " (required)" } else { "" };
            s.push_str(&format!("  --{}{}\t{}\n", flag.name, req, flag.desc));
        }
        s.push_str(&format!("  example: blade create {}\n", spec.example()));
    }
    print!("{}", s);
    Ok(exit_codes::OK)
}
