use fson_core::config::{CodecConfig, NamingPolicy};
use fson_core::registry::{EnumDef, FieldDef, StructDef, TypeRegistry};
use fson_core::{from_json_str, to_json_string, Codec, ObjectRef, Value};
use std::sync::Arc;

fn main() {
    let registry = TypeRegistry::new();
    let registered = [
        registry.register(EnumDef::new("Role", ["Engineer", "Manager"])),
        registry.register(
            StructDef::new("Employee")
                .field(FieldDef::new("FullName", "string"))
                .field(FieldDef::new("Role", "Role"))
                .field(FieldDef::new("Manager", "Employee")),
        ),
    ];
    if let Some(Err(e)) = registered.into_iter().find(Result::is_err) {
        eprintln!("Failed to register types: {e}");
        return;
    }

    let config = CodecConfig::default().with_naming(NamingPolicy::CamelCase);
    let codec = Codec::new(Arc::new(registry), config);

    let boss = ObjectRef::new("Employee")
        .with("FullName", "Grace")
        .with("Role", Value::enumeration("Role", "Manager"));
    // Grace manages herself, which makes the graph cyclic.
    boss.set("Manager", boss.clone());
    let dev = ObjectRef::new("Employee")
        .with("FullName", "Linus")
        .with("Role", Value::enumeration("Role", "Engineer"))
        .with("Manager", boss);
    let team = Value::List(vec![Value::Object(dev)]);

    match to_json_string(&codec, "list<Employee>", &team, true) {
        Ok(text) => {
            println!("Serialized team:\n{text}");
            match from_json_str(&codec, "list<Employee>", &text) {
                Ok(back) => println!("Read back equal: {}", back.deep_eq(&team)),
                Err(e) => eprintln!("Failed to read back: {:?}", miette::Report::new(e)),
            }
        }
        Err(e) => eprintln!("Failed to serialize: {:?}", miette::Report::new(e)),
    }

    match codec.emit_aot_converter("Employee") {
        Ok(source) => println!("\nGenerated converter:\n{source}"),
        Err(e) => eprintln!("Failed to emit converter: {e}"),
    }
}
