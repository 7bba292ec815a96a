// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android channel adapter via JNI.
//
// Requires the Android NDK and targets `aarch64-linux-android` or
// `armv7-linux-androideabi`. The Kotlin side keeps its `MethodChannel` and
// forwards every call to `LovegameBridge.nativeOnMethodCall`; the
// `MethodChannel.Result` object is handed over as-is and answered from Rust.
//
// ## Architecture notes
//
// The owning context is the app's main `Looper`. Rust keeps a `MainQueue`
// of pending deliveries; every post also schedules a `NativePump` runnable
// on a main-looper `Handler`, and that runnable calls back into
// `nativeDrainMainQueue` which runs the queued deliveries on the main
// thread. Worker threads only ever touch JNI to post that runnable.
//
// Kotlin glue expected by this module:
//
// ```kotlin
// object LovegameBridge {
//     external fun nativeInit(): Boolean
//     external fun nativeOnMethodCall(method: String, arguments: Any?, result: MethodChannel.Result)
//     external fun nativeDrainMainQueue()
// }
// class NativePump : Runnable { override fun run() = LovegameBridge.nativeDrainMainQueue() }
// ```

#![cfg(target_os = "android")]

use std::sync::{Arc, Mutex, OnceLock};

use jni::objects::{GlobalRef, JClass, JList, JMap, JObject, JString, JValue};
use jni::sys::jboolean;
use jni::{JNIEnv, JavaVM};

use lovegame_core::BridgeConfig;
use lovegame_core::error::{BridgeError, Result};
use lovegame_core::types::{Outcome, Value};

use crate::channel::MethodChannel;
use crate::main_loop::{MainHandle, MainQueue};
use crate::traits::{OwningContext, PlatformChannel, Reply, Task};

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

/// Runnable that drains the main queue when the looper runs it.
const PUMP_CLASS: &str = "com/example/lovegame/NativePump";

/// Local references one reply may create before its frame is popped.
const REPLY_LOCAL_FRAME: i32 = 32;

/// Convenience: map any `jni::errors::Error` into `BridgeError::Bridge`.
fn jni_err(context: &str, e: jni::errors::Error) -> BridgeError {
    BridgeError::Bridge(format!("{context}: {e}"))
}

/// Describe and clear a Java exception left behind by a failed call.
///
/// Only exception-handling JNI calls are legal while one is pending, and a
/// drain runs many replies in the same native frame.
fn clear_pending_exception(env: &mut JNIEnv) {
    if env.exception_check().unwrap_or(false) {
        env.exception_describe().ok();
        env.exception_clear().ok();
    }
}

/// Process-wide bridge state, created once by `nativeInit`.
struct AndroidState {
    vm: JavaVM,
    queue: Mutex<MainQueue>,
    channel: AndroidChannel,
}

static STATE: OnceLock<AndroidState> = OnceLock::new();

fn state() -> Result<&'static AndroidState> {
    STATE
        .get()
        .ok_or_else(|| BridgeError::Bridge("LovegameBridge.nativeInit was not called".into()))
}

// ---------------------------------------------------------------------------
// Owning context: main Looper
// ---------------------------------------------------------------------------

/// Posts into the Rust queue and wakes the main looper to drain it.
pub struct LooperContext {
    main: MainHandle,
    /// `android.os.Handler` bound to `Looper.getMainLooper()`.
    handler: GlobalRef,
}

impl LooperContext {
    fn new(env: &mut JNIEnv, main: MainHandle) -> Result<Self> {
        let looper = env
            .call_static_method(
                "android/os/Looper",
                "getMainLooper",
                "()Landroid/os/Looper;",
                &[],
            )
            .map_err(|e| jni_err("getMainLooper", e))?
            .l()
            .map_err(|e| jni_err("getMainLooper->l", e))?;
        let handler = env
            .new_object(
                "android/os/Handler",
                "(Landroid/os/Looper;)V",
                &[JValue::Object(&looper)],
            )
            .map_err(|e| jni_err("new Handler", e))?;
        let handler = env
            .new_global_ref(handler)
            .map_err(|e| jni_err("Handler global ref", e))?;
        Ok(Self { main, handler })
    }

    fn wake_looper(&self) -> Result<()> {
        let state = state()?;
        let mut env = state
            .vm
            .attach_current_thread_permanently()
            .map_err(|e| jni_err("attach thread", e))?;
        let woken = self.post_pump(&mut env);
        if woken.is_err() {
            clear_pending_exception(&mut env);
        }
        woken
    }

    fn post_pump(&self, env: &mut JNIEnv) -> Result<()> {
        let pump = env
            .new_object(PUMP_CLASS, "()V", &[])
            .map_err(|e| jni_err("new NativePump", e))?;
        let posted = env
            .call_method(
                self.handler.as_obj(),
                "post",
                "(Ljava/lang/Runnable;)Z",
                &[JValue::Object(&pump)],
            )
            .map_err(|e| jni_err("Handler.post", e))?
            .z()
            .map_err(|e| jni_err("Handler.post->z", e))?;
        env.delete_local_ref(pump).ok();

        if posted {
            Ok(())
        } else {
            // Looper is quitting.
            Err(BridgeError::OwningContextClosed)
        }
    }
}

impl OwningContext for LooperContext {
    fn post(&self, task: Task) -> Result<()> {
        self.main.post_and_wake(task, || self.wake_looper())
    }
}

// ---------------------------------------------------------------------------
// Reply: io.flutter.plugin.common.MethodChannel.Result
// ---------------------------------------------------------------------------

/// Global reference to the host's `MethodChannel.Result` for one call.
struct JavaResult {
    result: GlobalRef,
}

impl Reply for JavaResult {
    fn send(self: Box<Self>, outcome: Outcome) {
        if let Err(e) = self.send_in_frame(outcome) {
            tracing::error!(error = %e, "Android: failed to answer method call");
        }
    }
}

impl JavaResult {
    /// Answer inside a local frame so a long drain does not pile up local
    /// references, and leave no exception pending for the next reply.
    fn send_in_frame(&self, outcome: Outcome) -> Result<()> {
        let state = state()?;
        let mut env = state
            .vm
            .attach_current_thread_permanently()
            .map_err(|e| jni_err("attach thread", e))?;

        let answered = env
            .with_local_frame(REPLY_LOCAL_FRAME, |env| {
                let answered = self.answer(env, outcome);
                if answered.is_err() {
                    clear_pending_exception(env);
                }
                Ok::<_, jni::errors::Error>(answered)
            })
            .map_err(|e| jni_err("local frame", e));
        if answered.is_err() {
            clear_pending_exception(&mut env);
        }
        answered?
    }

    fn answer(&self, env: &mut JNIEnv, outcome: Outcome) -> Result<()> {
        let result = self.result.as_obj();

        match outcome {
            Outcome::Success(value) => {
                let obj = value_to_java(env, &value)?;
                env.call_method(
                    result,
                    "success",
                    "(Ljava/lang/Object;)V",
                    &[JValue::Object(&obj)],
                )
                .map_err(|e| jni_err("Result.success", e))?;
            }
            Outcome::Failure(error) => {
                let code = env
                    .new_string(&error.code)
                    .map_err(|e| jni_err("new_string code", e))?;
                let message = env
                    .new_string(&error.message)
                    .map_err(|e| jni_err("new_string message", e))?;
                let details = match &error.details {
                    Some(d) => value_to_java(env, d)?,
                    None => JObject::null(),
                };
                env.call_method(
                    result,
                    "error",
                    "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/Object;)V",
                    &[
                        JValue::Object(&code),
                        JValue::Object(&message),
                        JValue::Object(&details),
                    ],
                )
                .map_err(|e| jni_err("Result.error", e))?;
            }
            Outcome::NotImplemented => {
                env.call_method(result, "notImplemented", "()V", &[])
                    .map_err(|e| jni_err("Result.notImplemented", e))?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Value conversion
// ---------------------------------------------------------------------------

fn is_instance(env: &mut JNIEnv, obj: &JObject, class: &str) -> Result<bool> {
    env.is_instance_of(obj, class)
        .map_err(|e| jni_err(class, e))
}

/// Convert a boxed Java value into a [`Value`]. Unknown classes are carried
/// as their `toString()`.
fn java_to_value(env: &mut JNIEnv, obj: &JObject) -> Result<Value> {
    if obj.is_null() {
        return Ok(Value::Null);
    }

    if is_instance(env, obj, "java/lang/String")? {
        let jstr: &JString = obj.into();
        let s: String = env
            .get_string(jstr)
            .map_err(|e| jni_err("get_string", e))?
            .into();
        return Ok(Value::String(s));
    }

    if is_instance(env, obj, "java/lang/Boolean")? {
        let b = env
            .call_method(obj, "booleanValue", "()Z", &[])
            .and_then(|v| v.z())
            .map_err(|e| jni_err("booleanValue", e))?;
        return Ok(Value::Bool(b));
    }

    if is_instance(env, obj, "java/lang/Double")? || is_instance(env, obj, "java/lang/Float")? {
        let d = env
            .call_method(obj, "doubleValue", "()D", &[])
            .and_then(|v| v.d())
            .map_err(|e| jni_err("doubleValue", e))?;
        return Ok(Value::Float(d));
    }

    if is_instance(env, obj, "java/lang/Number")? {
        let n = env
            .call_method(obj, "longValue", "()J", &[])
            .and_then(|v| v.j())
            .map_err(|e| jni_err("longValue", e))?;
        return Ok(Value::Int(n));
    }

    if is_instance(env, obj, "java/util/Map")? {
        let map = JMap::from_env(env, obj).map_err(|e| jni_err("JMap", e))?;
        let mut iter = map.iter(env).map_err(|e| jni_err("Map.iter", e))?;
        let mut out = std::collections::BTreeMap::new();
        while let Some((k, v)) = iter.next(env).map_err(|e| jni_err("Map.next", e))? {
            match java_to_value(env, &k)? {
                Value::String(key) => {
                    let value = java_to_value(env, &v)?;
                    out.insert(key, value);
                }
                other => {
                    tracing::warn!(key_type = other.type_name(), "Android: skipping non-string map key");
                }
            }
            env.delete_local_ref(k).ok();
            env.delete_local_ref(v).ok();
        }
        return Ok(Value::Map(out));
    }

    if is_instance(env, obj, "java/util/List")? {
        let list = JList::from_env(env, obj).map_err(|e| jni_err("JList", e))?;
        let mut iter = list.iter(env).map_err(|e| jni_err("List.iter", e))?;
        let mut out = Vec::new();
        while let Some(item) = iter.next(env).map_err(|e| jni_err("List.next", e))? {
            out.push(java_to_value(env, &item)?);
            env.delete_local_ref(item).ok();
        }
        return Ok(Value::List(out));
    }

    let text: JString = env
        .call_method(obj, "toString", "()Ljava/lang/String;", &[])
        .and_then(|v| v.l())
        .map_err(|e| jni_err("toString", e))?
        .into();
    let s: String = env
        .get_string(&text)
        .map_err(|e| jni_err("get_string", e))?
        .into();
    tracing::warn!(value = %s, "Android: unsupported argument class, passing as string");
    Ok(Value::String(s))
}

/// Convert a [`Value`] into the boxed Java object the host codec expects.
fn value_to_java<'local>(env: &mut JNIEnv<'local>, value: &Value) -> Result<JObject<'local>> {
    let obj = match value {
        Value::Null => JObject::null(),
        Value::Bool(b) => env
            .call_static_method(
                "java/lang/Boolean",
                "valueOf",
                "(Z)Ljava/lang/Boolean;",
                &[JValue::Bool(*b as jboolean)],
            )
            .and_then(|v| v.l())
            .map_err(|e| jni_err("Boolean.valueOf", e))?,
        Value::Int(i) => env
            .call_static_method(
                "java/lang/Long",
                "valueOf",
                "(J)Ljava/lang/Long;",
                &[JValue::Long(*i)],
            )
            .and_then(|v| v.l())
            .map_err(|e| jni_err("Long.valueOf", e))?,
        Value::Float(f) => env
            .call_static_method(
                "java/lang/Double",
                "valueOf",
                "(D)Ljava/lang/Double;",
                &[JValue::Double(*f)],
            )
            .and_then(|v| v.l())
            .map_err(|e| jni_err("Double.valueOf", e))?,
        Value::String(s) => env
            .new_string(s)
            .map_err(|e| jni_err("new_string", e))?
            .into(),
        Value::List(items) => {
            let list = env
                .new_object("java/util/ArrayList", "()V", &[])
                .map_err(|e| jni_err("new ArrayList", e))?;
            {
                let jlist = JList::from_env(env, &list).map_err(|e| jni_err("JList", e))?;
                for item in items {
                    let obj = value_to_java(env, item)?;
                    jlist.add(env, &obj).map_err(|e| jni_err("List.add", e))?;
                    env.delete_local_ref(obj).ok();
                }
            }
            list
        }
        Value::Map(entries) => {
            let map = env
                .new_object("java/util/HashMap", "()V", &[])
                .map_err(|e| jni_err("new HashMap", e))?;
            {
                let jmap = JMap::from_env(env, &map).map_err(|e| jni_err("JMap", e))?;
                for (k, v) in entries {
                    let key = env.new_string(k).map_err(|e| jni_err("new_string key", e))?;
                    let val = value_to_java(env, v)?;
                    jmap.put(env, &key, &val).map_err(|e| jni_err("Map.put", e))?;
                    env.delete_local_ref(key).ok();
                    env.delete_local_ref(val).ok();
                }
            }
            map
        }
    };
    Ok(obj)
}

// ---------------------------------------------------------------------------
// Channel adapter
// ---------------------------------------------------------------------------

/// Android implementation of the channel adapter.
pub struct AndroidChannel {
    channel: MethodChannel,
}

impl PlatformChannel for AndroidChannel {
    fn platform_name(&self) -> &str {
        "Android"
    }

    fn channel(&self) -> &MethodChannel {
        &self.channel
    }
}

fn init(env: &mut JNIEnv) -> Result<()> {
    if STATE.get().is_some() {
        return Ok(());
    }

    let vm = env.get_java_vm().map_err(|e| jni_err("get_java_vm", e))?;
    let queue = MainQueue::new();
    let context = LooperContext::new(env, queue.handle())?;
    let config = BridgeConfig::default();
    let channel = MethodChannel::with_builtin(&config, Arc::new(context))?;

    let installed = STATE.set(AndroidState {
        vm,
        queue: Mutex::new(queue),
        channel: AndroidChannel { channel },
    });
    if installed.is_err() {
        // Lost a race with another init; the winner's state stands.
        return Ok(());
    }

    // Deferred until the looper turns, once the engine is fully attached.
    state()?.channel.channel().install()?;
    tracing::info!(channel = %config.channel_name, "Android: bridge initialised");
    Ok(())
}

fn on_method_call(env: &mut JNIEnv, method: &JString, arguments: &JObject, result: &JObject) -> Result<()> {
    let state = state()?;
    let method: String = env
        .get_string(method)
        .map_err(|e| jni_err("method name", e))?
        .into();
    let arguments = match java_to_value(env, arguments)? {
        Value::Null => None,
        other => Some(other),
    };
    let result = env
        .new_global_ref(result)
        .map_err(|e| jni_err("Result global ref", e))?;

    state
        .channel
        .channel()
        .handle(&method, arguments, JavaResult { result });
    Ok(())
}

// ---------------------------------------------------------------------------
// JNI exports
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_lovegame_LovegameBridge_nativeInit<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jboolean {
    match init(&mut env) {
        Ok(()) => 1,
        Err(e) => {
            tracing::error!(error = %e, "Android: bridge init failed");
            0
        }
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_lovegame_LovegameBridge_nativeOnMethodCall<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    method: JString<'local>,
    arguments: JObject<'local>,
    result: JObject<'local>,
) {
    if let Err(e) = on_method_call(&mut env, &method, &arguments, &result) {
        // No Rust-side reply exists yet; answer the host directly so the
        // caller never waits forever.
        tracing::error!(error = %e, "Android: method call could not be dispatched");
        clear_pending_exception(&mut env);
        if let Err(reply_err) = answer_dispatch_failure(&mut env, &result, &e) {
            tracing::error!(error = %reply_err, "Android: could not report dispatch failure");
            clear_pending_exception(&mut env);
        }
    }
}

fn answer_dispatch_failure(env: &mut JNIEnv, result: &JObject, error: &BridgeError) -> Result<()> {
    let code = env
        .new_string(error.code())
        .map_err(|e| jni_err("new_string code", e))?;
    let message = env
        .new_string(error.to_string())
        .map_err(|e| jni_err("new_string message", e))?;
    env.call_method(
        result,
        "error",
        "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/Object;)V",
        &[
            JValue::Object(&code),
            JValue::Object(&message),
            JValue::Object(&JObject::null()),
        ],
    )
    .map_err(|e| jni_err("Result.error", e))?;
    Ok(())
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_lovegame_LovegameBridge_nativeDrainMainQueue<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    let Ok(state) = state() else {
        return;
    };
    match state.queue.lock() {
        Ok(queue) => {
            queue.pump();
        }
        Err(_) => tracing::error!("Android: main queue lock poisoned"),
    }
}
