use mailrules::RuleSet;

fn main() {
    let ruleset = RuleSet::from_file("demos/rules.yaml").expect("failed to load rules");

    println!("{ruleset}");

    for rule in ruleset.export() {
        let properties: Vec<String> = rule
            .properties
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        println!("{:016x}  {}", rule.id, properties.join(", "));
    }
}
