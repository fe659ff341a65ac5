//! Lua runtime for script extensions.
//!
//! Each extension gets its own VM with only the `table`, `string`, `math` and
//! `utf8` libraries. No `io`, `os`, `package` or `debug`; `dofile`,
//! `loadfile` and `string.dump` are removed, and `load` only accepts source
//! text. Precompiled chunks are never run. The script sees a `console` table, its own
//! `EXTENSION_PATH`, and during a hook call a `host` table bound to that
//! call's [`Capabilities`].
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mlua::{
    ChunkMode, DeserializeOptions, Function, Lua, LuaOptions, LuaSerdeExt, MultiValue, RegistryKey,
    SerializeOptions, StdLib, Table, Value as LuaValue, Variadic,
};
use serde_json::Value;

use crate::extension_system::capability::{self, Capabilities};
use crate::extension_system::descriptor::{DescriptorBuilder, ExtensionDescriptor};
use crate::extension_system::error::{ExtensionError, ExtensionResult};
use crate::extension_system::hooks::{Extension, Hook, HookTable};

struct LuaVm {
    lua: Lua,
    hooks: HookTable<RegistryKey>,
}

/// An extension backed by a Lua script
pub struct LuaExtension {
    descriptor: ExtensionDescriptor,
    vm: Arc<Mutex<LuaVm>>,
}

impl fmt::Debug for LuaExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LuaExtension")
            .field("id", &self.descriptor.id)
            .field("location", &self.descriptor.location)
            .finish()
    }
}

fn serialize_options() -> SerializeOptions {
    SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false)
}

fn deserialize_options() -> DeserializeOptions {
    DeserializeOptions::new().deny_unsupported_types(false)
}

impl LuaExtension {
    /// Load the script at `entry`; `location` is the file or directory the
    /// extension was discovered as.
    pub fn load(entry: &Path, location: &Path) -> ExtensionResult<Self> {
        let source = std::fs::read_to_string(entry)
            .map_err(|e| ExtensionError::io(e, "read_extension", entry))?;
        Self::from_source(&source, &entry.to_string_lossy(), location)
    }

    pub fn from_source(source: &str, chunk_name: &str, location: &Path) -> ExtensionResult<Self> {
        let load_err = |e: mlua::Error| ExtensionError::Load {
            path: location.to_path_buf(),
            message: e.to_string(),
        };

        let lua = new_sandbox(location).map_err(load_err)?;
        let exports: LuaValue = lua
            .load(source)
            .set_name(format!("@{}", chunk_name))
            .set_mode(ChunkMode::Text)
            .eval()
            .map_err(load_err)?;
        let exports = match exports {
            LuaValue::Table(table) => table,
            other => {
                return Err(ExtensionError::InvalidExtension {
                    path: location.to_path_buf(),
                    reason: format!("script returned {} instead of a table", other.type_name()),
                });
            }
        };

        let mut hooks = HookTable::new();
        for pair in exports.clone().pairs::<LuaValue, LuaValue>() {
            let (key, value) = pair.map_err(load_err)?;
            if let (LuaValue::String(name), LuaValue::Function(f)) = (key, value) {
                let name = name.to_string_lossy();
                let key = lua.create_registry_value(f).map_err(load_err)?;
                hooks.insert(Hook::from_name(&name), key);
            }
        }

        // Functions are dropped by the conversion, leaving the data fields
        let fields: Value = lua
            .from_value_with(LuaValue::Table(exports), deserialize_options())
            .map_err(load_err)?;
        let descriptor = descriptor_from_fields(&fields, location, hooks.implemented())?;

        lua.globals()
            .set("EXTENSION_ID", descriptor.id.as_str())
            .map_err(load_err)?;

        Ok(Self {
            descriptor,
            vm: Arc::new(Mutex::new(LuaVm { lua, hooks })),
        })
    }
}

fn descriptor_from_fields(
    fields: &Value,
    location: &Path,
    hooks: Vec<Hook>,
) -> ExtensionResult<ExtensionDescriptor> {
    let text = |key: &str| match fields.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let Some(id) = text("id") else {
        return Err(ExtensionError::InvalidExtension {
            path: location.to_path_buf(),
            reason: "missing or empty 'id'".to_string(),
        });
    };

    let mut builder = DescriptorBuilder::new(&id, location).hooks(hooks);
    if let Some(name) = text("name") {
        builder = builder.name(&name);
    }
    if let Some(author) = text("author") {
        builder = builder.author(&author);
    }
    if let Some(version) = text("version") {
        builder = builder.version(&version);
    }
    if let Some(app_id) = text("steamAppId") {
        builder = builder.steam_app_id(&app_id);
    }
    if let Some(executable) = text("executable") {
        builder = builder.executable(&executable);
    }
    if let Some(Value::Array(extensions)) = fields.get("modFileExtensions") {
        for ext in extensions.iter().filter_map(Value::as_str) {
            builder = builder.mod_file_extension(ext);
        }
    }
    if let Some(Value::Array(sources)) = fields.get("modSources") {
        for source in sources {
            if let (Some(text), Some(url)) = (
                source.get("text").and_then(Value::as_str),
                source.get("url").and_then(Value::as_str),
            ) {
                builder = builder.mod_source(text, url);
            }
        }
    }
    if let Some(theme) = fields.get("theme") {
        builder = builder.theme(theme.clone());
    }
    Ok(builder.build())
}

fn display_value(value: &LuaValue) -> String {
    match value {
        LuaValue::Nil => "nil".to_string(),
        LuaValue::Boolean(b) => b.to_string(),
        LuaValue::Integer(i) => i.to_string(),
        LuaValue::Number(n) => n.to_string(),
        LuaValue::String(s) => s.to_string_lossy(),
        other => other.type_name().to_string(),
    }
}

fn join_args(args: &Variadic<LuaValue>) -> String {
    args.iter().map(display_value).collect::<Vec<_>>().join(" ")
}

fn new_sandbox(location: &Path) -> mlua::Result<Lua> {
    let lua = Lua::new_with(
        StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8,
        LuaOptions::default(),
    )?;
    let globals = lua.globals();
    globals.set("dofile", LuaValue::Nil)?;
    globals.set("loadfile", LuaValue::Nil)?;
    globals.get::<Table>("string")?.set("dump", LuaValue::Nil)?;

    // `load` with the mode argument pinned to "t"
    let raw_load: Function = globals.get("load")?;
    let text_load = lua.create_function(move |lua, args: MultiValue| {
        let mut args: Vec<LuaValue> = args.into_iter().collect();
        if args.len() < 3 {
            args.resize(3, LuaValue::Nil);
        }
        args[2] = LuaValue::String(lua.create_string("t")?);
        raw_load.call::<MultiValue>(MultiValue::from_vec(args))
    })?;
    globals.set("load", text_load)?;
    globals.set("EXTENSION_PATH", location.to_string_lossy().into_owned())?;

    let label = location
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let console = lua.create_table()?;
    for level in ["log", "info", "warn", "error"] {
        let label = label.clone();
        let f = lua.create_function(move |_, args: Variadic<LuaValue>| {
            let line = join_args(&args);
            match level {
                "warn" => log::warn!(target: "extension", "[{}] {}", label, line),
                "error" => log::error!(target: "extension", "[{}] {}", label, line),
                _ => log::info!(target: "extension", "[{}] {}", label, line),
            }
            Ok(())
        })?;
        console.set(level, f)?;
    }
    globals.set("print", console.get::<Function>("log")?)?;
    globals.set("console", console)?;
    Ok(lua)
}

fn external(e: ExtensionError) -> mlua::Error {
    mlua::Error::external(e)
}

/// Build the `host` table for one call. Every function captures `caps`.
fn host_table(lua: &Lua, caps: &Arc<Capabilities>) -> mlua::Result<Table> {
    let host = lua.create_table()?;

    macro_rules! query {
        ($name:literal, $method:ident) => {{
            let caps = caps.clone();
            host.set(
                $name,
                lua.create_function(move |_, path: String| {
                    caps.$method(Path::new(&path)).map_err(external)
                })?,
            )?;
        }};
    }
    query!("exists", exists);
    query!("is_file", is_file);
    query!("is_dir", is_dir);
    query!("is_symlink", is_symlink);
    query!("list", list);

    let join = lua.create_function(|_, parts: Variadic<String>| Ok(capability::join(&parts)))?;
    host.set("join", join)?;
    let basename = lua.create_function(|_, path: String| Ok(capability::basename(&path)))?;
    host.set("basename", basename)?;
    let dirname = lua.create_function(|_, path: String| Ok(capability::dirname(&path)))?;
    host.set("dirname", dirname)?;

    let c = caps.clone();
    host.set(
        "game_root",
        lua.create_function(move |_, ()| {
            Ok(c.game_root().map(|p| p.to_string_lossy().into_owned()))
        })?,
    )?;
    let c = caps.clone();
    host.set("mod_id", lua.create_function(move |_, ()| Ok(c.mod_id().map(str::to_string)))?)?;

    let c = caps.clone();
    host.set(
        "copy",
        lua.create_function(move |_, (src, dest): (String, String)| {
            let created = c.copy(Path::new(&src), Path::new(&dest)).map_err(external)?;
            Ok(created.len())
        })?,
    )?;
    let c = caps.clone();
    host.set(
        "deploy",
        lua.create_function(move |_, (src, dest): (String, String)| {
            c.deploy(Path::new(&src), Path::new(&dest))
                .map(|method| method.as_str())
                .map_err(external)
        })?,
    )?;
    let c = caps.clone();
    host.set(
        "delete",
        lua.create_function(move |_, path: String| {
            c.delete(Path::new(&path)).map(|_| true).map_err(external)
        })?,
    )?;
    let c = caps.clone();
    host.set(
        "remove_empty_dir",
        lua.create_function(move |_, path: String| {
            c.remove_empty_dir(Path::new(&path)).map(|_| true).map_err(external)
        })?,
    )?;
    let c = caps.clone();
    host.set(
        "download",
        lua.create_function(move |_, (url, dest): (String, String)| {
            c.download(&url, Path::new(&dest)).map_err(external)
        })?,
    )?;
    let c = caps.clone();
    host.set(
        "fetch_json",
        lua.create_function(move |lua, url: String| {
            let value = c.fetch_json(&url).map_err(external)?;
            lua.to_value_with(&value, serialize_options())
        })?,
    )?;
    let c = caps.clone();
    host.set(
        "fetch_text",
        lua.create_function(move |_, url: String| c.fetch_text(&url).map_err(external))?,
    )?;

    Ok(host)
}

/// Find an [`ExtensionError`] raised by a capability inside a Lua error chain
fn capability_error(error: &mlua::Error) -> Option<&ExtensionError> {
    match error {
        mlua::Error::CallbackError { cause, .. } => capability_error(cause),
        mlua::Error::WithContext { cause, .. } => capability_error(cause),
        mlua::Error::ExternalError(inner) => inner.downcast_ref::<ExtensionError>(),
        _ => None,
    }
}

fn map_call_error(extension_id: &str, hook: &Hook, error: mlua::Error) -> ExtensionError {
    match capability_error(&error) {
        Some(ExtensionError::AccessDenied { operation, path }) => ExtensionError::AccessDenied {
            operation: operation.clone(),
            path: path.clone(),
        },
        Some(ExtensionError::DetectionReadOnly { operation, path }) => {
            ExtensionError::DetectionReadOnly { operation: operation.clone(), path: path.clone() }
        }
        Some(ExtensionError::Expired) => ExtensionError::Expired,
        _ => ExtensionError::Script {
            extension_id: extension_id.to_string(),
            hook: hook.clone(),
            message: error.to_string(),
        },
    }
}

fn call_in_vm(
    vm: &LuaVm,
    extension_id: &str,
    hook: &Hook,
    caps: Arc<Capabilities>,
    args: Vec<Value>,
) -> ExtensionResult<Option<Value>> {
    let Some(key) = vm.hooks.get(hook) else {
        return Ok(None);
    };
    let lua = &vm.lua;
    let script_err = |e: mlua::Error| map_call_error(extension_id, hook, e);

    let function: Function = lua.registry_value(key).map_err(script_err)?;
    let lua_args = args
        .iter()
        .map(|arg| lua.to_value_with(arg, serialize_options()))
        .collect::<mlua::Result<Vec<_>>>()
        .map_err(script_err)?;

    let globals = lua.globals();
    globals.set("host", host_table(lua, &caps).map_err(script_err)?).map_err(script_err)?;
    let outcome = function.call::<LuaValue>(MultiValue::from_vec(lua_args));
    // The table may have been stashed by the script; expiring makes it inert
    caps.expire();
    globals.set("host", LuaValue::Nil).map_err(script_err)?;

    let result = outcome.map_err(script_err)?;
    let value: Value = lua.from_value_with(result, deserialize_options()).map_err(script_err)?;
    Ok(if value.is_null() { None } else { Some(value) })
}

#[async_trait]
impl Extension for LuaExtension {
    fn descriptor(&self) -> &ExtensionDescriptor {
        &self.descriptor
    }

    async fn call(
        &self,
        hook: &Hook,
        caps: Arc<Capabilities>,
        args: Vec<Value>,
    ) -> ExtensionResult<Option<Value>> {
        if !self.implements(hook) {
            return Ok(None);
        }
        let vm = self.vm.clone();
        let hook = hook.clone();
        let extension_id = self.descriptor.id.clone();
        tokio::task::spawn_blocking(move || {
            let vm = vm.lock().map_err(|_| {
                ExtensionError::TaskFailed(format!("VM of '{}' is poisoned", extension_id))
            })?;
            call_in_vm(&vm, &extension_id, &hook, caps, args)
        })
        .await
        .map_err(|e| ExtensionError::TaskFailed(e.to_string()))?
    }
}

/// Entry script for an extension location: the file itself, or `init.lua`
/// inside a directory.
pub fn entry_script(location: &Path) -> PathBuf {
    if location.is_dir() {
        location.join(ENTRY_FILE)
    } else {
        location.to_path_buf()
    }
}

/// Entry file of a directory extension
pub const ENTRY_FILE: &str = "init.lua";
