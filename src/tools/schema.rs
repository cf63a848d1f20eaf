//! 工具参数 JSON Schema 生成（schemars）
//!
//! 每个工具的输入结构体派生 JsonSchema，这里把根 schema 裁成 provider 需要的 `parameters` 对象。

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde_json::Value;

/// 生成某输入类型的参数 schema（内联子类型，去掉 $schema / title）
pub fn parameters_for<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let schema = settings.into_generator().into_root_schema_for::<T>();
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| empty_object());
    if let Some(map) = value.as_object_mut() {
        map.remove("title");
        map.remove("definitions");
        map.entry("properties").or_insert_with(|| Value::Object(Default::default()));
    }
    value
}

fn empty_object() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}
