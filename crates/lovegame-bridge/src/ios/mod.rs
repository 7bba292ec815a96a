// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iOS channel adapter via objc2.
//
// Requires compilation with the iOS SDK (Xcode). The Swift `AppDelegate`
// keeps its `FlutterMethodChannel` and forwards each call object plus a
// C reply callback into `lovegame_channel_handle`. Arguments arrive as
// Foundation objects (`NSDictionary`, `NSString`, `NSNumber`, ...) and are
// converted into `Value`s before dispatch.
//
// The owning context is the main dispatch queue: every delivery goes
// through `dispatch_async_f` on `_dispatch_main_q`, so the Swift reply
// callback always runs on the main thread.
//
// Swift glue expected by this module:
//
// ```swift
// let box = Unmanaged.passRetained(ResultBox(result)).toOpaque()
// lovegame_channel_handle(Unmanaged.passUnretained(call).toOpaque(), lovegameReply, box)
// ```
//
// where `lovegameReply` takes back the retained box, calls the stored
// `FlutterResult` with the object pointer (or `nil`), and releases it.

#![cfg(target_os = "ios")]

use std::ffi::{CStr, c_void};
use std::sync::{Arc, OnceLock};

use objc2::rc::Retained;
use objc2::runtime::{AnyClass, AnyObject};
use objc2::{MainThreadMarker, Message, class, msg_send};
use objc2_foundation::{NSNumber, NSString};

use lovegame_core::BridgeConfig;
use lovegame_core::error::{BridgeError, Result};
use lovegame_core::types::{Outcome, Value};

use crate::channel::MethodChannel;
use crate::traits::{OwningContext, PlatformChannel, Reply, Task};

// ---------------------------------------------------------------------------
// libdispatch FFI (main queue)
// ---------------------------------------------------------------------------
// `dispatch_get_main_queue()` is a header macro over this symbol.

unsafe extern "C" {
    static _dispatch_main_q: c_void;
    fn dispatch_async_f(
        queue: *const c_void,
        context: *mut c_void,
        work: extern "C" fn(*mut c_void),
    );
}

// Flutter.framework sentinel returned for unknown methods.
unsafe extern "C" {
    static FlutterMethodNotImplemented: &'static AnyObject;
}

extern "C" fn run_task(context: *mut c_void) {
    // SAFETY: `context` was produced by `Box::into_raw` in `post` and is
    // consumed exactly once here.
    let task = unsafe { Box::from_raw(context.cast::<Task>()) };
    task();
}

/// Owning context backed by the main dispatch queue.
pub struct MainDispatchContext;

impl OwningContext for MainDispatchContext {
    fn post(&self, task: Task) -> Result<()> {
        let context = Box::into_raw(Box::new(task)).cast::<c_void>();
        // SAFETY: the main queue lives for the whole process and
        // `run_task` takes back ownership of `context`.
        unsafe {
            dispatch_async_f((&raw const _dispatch_main_q).cast(), context, run_task);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reply: C callback supplied by Swift
// ---------------------------------------------------------------------------

/// Receives the reply object (`nil` for a null success, a `FlutterError`,
/// or `FlutterMethodNotImplemented`) together with the Swift context.
pub type ReplyCallback = unsafe extern "C" fn(context: *mut c_void, result: *mut AnyObject);

struct CallbackReply {
    callback: ReplyCallback,
    context: *mut c_void,
}

// SAFETY: the context pointer is an opaque retained Swift box; it is only
// dereferenced by the Swift callback, which runs on the main queue.
unsafe impl Send for CallbackReply {}

impl Reply for CallbackReply {
    fn send(self: Box<Self>, outcome: Outcome) {
        if MainThreadMarker::new().is_none() {
            tracing::error!("iOS: reply delivered off the main thread");
        }

        let object = match outcome {
            Outcome::Success(Value::Null) => None,
            Outcome::Success(value) => Some(value_to_object(&value)),
            Outcome::Failure(error) => {
                match flutter_error(&error.code, &error.message, error.details.as_ref()) {
                    Some(object) => Some(object),
                    None => {
                        // `nil` would read as a null success; report no
                        // handler rather than pretend the call worked.
                        tracing::error!(code = %error.code, "iOS: answering failure as not implemented");
                        Some(not_implemented())
                    }
                }
            }
            Outcome::NotImplemented => Some(not_implemented()),
        };

        let ptr = object
            .as_ref()
            .map_or(std::ptr::null_mut(), |o| Retained::as_ptr(o).cast_mut());
        // SAFETY: contract of `lovegame_channel_handle`; the callback and
        // context come from the Swift side and are called exactly once.
        unsafe { (self.callback)(self.context, ptr) };
    }
}

fn not_implemented() -> Retained<AnyObject> {
    // SAFETY: exported constant from Flutter.framework.
    unsafe { FlutterMethodNotImplemented }.retain()
}

fn flutter_error(code: &str, message: &str, details: Option<&Value>) -> Option<Retained<AnyObject>> {
    let Some(cls) = AnyClass::get(c"FlutterError") else {
        tracing::error!("iOS: FlutterError class not found");
        return None;
    };
    let code = NSString::from_str(code);
    let message = NSString::from_str(message);
    let details = details.map(value_to_object);
    // SAFETY: `+[FlutterError errorWithCode:message:details:]` takes two
    // strings and a nullable object.
    let error: Retained<AnyObject> = unsafe {
        msg_send![
            cls,
            errorWithCode: &*code,
            message: &*message,
            details: details.as_deref()
        ]
    };
    Some(error)
}

// ---------------------------------------------------------------------------
// Value conversion
// ---------------------------------------------------------------------------

fn is_kind_of(obj: &AnyObject, cls: &AnyClass) -> bool {
    // SAFETY: `isKindOfClass:` is defined on every NSObject.
    unsafe { msg_send![obj, isKindOfClass: cls] }
}

/// Foundation object -> [`Value`].
fn object_to_value(obj: &AnyObject) -> Value {
    if let Some(s) = obj.downcast_ref::<NSString>() {
        return Value::String(s.to_string());
    }

    if let Some(n) = obj.downcast_ref::<NSNumber>() {
        // SAFETY: `objCType` returns a static NUL-terminated encoding.
        let encoding = unsafe { CStr::from_ptr(msg_send![n, objCType]) };
        return match encoding.to_bytes() {
            b"c" | b"B" => Value::Bool(n.as_bool()),
            b"f" | b"d" => Value::Float(n.as_f64()),
            _ => Value::Int(n.as_i64()),
        };
    }

    if is_kind_of(obj, class!(NSNull)) {
        return Value::Null;
    }

    if is_kind_of(obj, class!(NSDictionary)) {
        let mut out = std::collections::BTreeMap::new();
        // SAFETY: receiver is an NSDictionary (checked above).
        let keys: Retained<AnyObject> = unsafe { msg_send![obj, allKeys] };
        let count: usize = unsafe { msg_send![&*keys, count] };
        for i in 0..count {
            let key: Retained<AnyObject> = unsafe { msg_send![&*keys, objectAtIndex: i] };
            let Some(key_str) = key.downcast_ref::<NSString>() else {
                tracing::warn!("iOS: skipping non-string dictionary key");
                continue;
            };
            let value: Option<Retained<AnyObject>> = unsafe { msg_send![obj, objectForKey: &*key] };
            let value = value.as_deref().map_or(Value::Null, object_to_value);
            out.insert(key_str.to_string(), value);
        }
        return Value::Map(out);
    }

    if is_kind_of(obj, class!(NSArray)) {
        // SAFETY: receiver is an NSArray (checked above).
        let count: usize = unsafe { msg_send![obj, count] };
        let items = (0..count)
            .map(|i| {
                let item: Retained<AnyObject> = unsafe { msg_send![obj, objectAtIndex: i] };
                object_to_value(&item)
            })
            .collect();
        return Value::List(items);
    }

    // SAFETY: `description` is defined on every NSObject.
    let description: Retained<NSString> = unsafe { msg_send![obj, description] };
    tracing::warn!(value = %description, "iOS: unsupported argument class, passing as string");
    Value::String(description.to_string())
}

fn upcast<T: Message>(obj: Retained<T>) -> Retained<AnyObject> {
    // SAFETY: every Objective-C object is an `AnyObject`.
    unsafe { Retained::cast_unchecked(obj) }
}

/// [`Value`] -> Foundation object, as the Flutter standard codec expects.
fn value_to_object(value: &Value) -> Retained<AnyObject> {
    match value {
        // SAFETY: `+[NSNull null]` returns the shared singleton.
        Value::Null => unsafe { msg_send![class!(NSNull), null] },
        Value::Bool(b) => upcast(NSNumber::new_bool(*b)),
        Value::Int(i) => upcast(NSNumber::new_i64(*i)),
        Value::Float(f) => upcast(NSNumber::new_f64(*f)),
        Value::String(s) => upcast(NSString::from_str(s)),
        Value::List(items) => {
            // SAFETY: plain Foundation collection construction.
            let array: Retained<AnyObject> = unsafe { msg_send![class!(NSMutableArray), new] };
            for item in items {
                let obj = value_to_object(item);
                let _: () = unsafe { msg_send![&*array, addObject: &*obj] };
            }
            array
        }
        Value::Map(entries) => {
            let dict: Retained<AnyObject> = unsafe { msg_send![class!(NSMutableDictionary), new] };
            for (k, v) in entries {
                let key = NSString::from_str(k);
                let obj = value_to_object(v);
                let _: () = unsafe { msg_send![&*dict, setObject: &*obj, forKey: &*key] };
            }
            dict
        }
    }
}

// ---------------------------------------------------------------------------
// Channel adapter
// ---------------------------------------------------------------------------

/// iOS implementation of the channel adapter.
pub struct IosChannel {
    channel: MethodChannel,
}

impl PlatformChannel for IosChannel {
    fn platform_name(&self) -> &str {
        "iOS"
    }

    fn channel(&self) -> &MethodChannel {
        &self.channel
    }
}

static CHANNEL: OnceLock<IosChannel> = OnceLock::new();

fn init() -> Result<&'static IosChannel> {
    if let Some(existing) = CHANNEL.get() {
        return Ok(existing);
    }
    let config = BridgeConfig::default();
    let channel = MethodChannel::with_builtin(&config, Arc::new(MainDispatchContext))?;
    let ios = CHANNEL.get_or_init(|| IosChannel { channel });
    // Installation runs on the next main-queue turn, after the engine is up.
    ios.channel.install()?;
    tracing::info!(channel = %config.channel_name, "iOS: bridge initialised");
    Ok(ios)
}

fn channel() -> Result<&'static IosChannel> {
    CHANNEL
        .get()
        .ok_or_else(|| BridgeError::Bridge("lovegame_channel_init was not called".into()))
}

// ---------------------------------------------------------------------------
// C exports
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn lovegame_channel_init() -> bool {
    match init() {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(error = %e, "iOS: bridge init failed");
            false
        }
    }
}

/// Handle one `FlutterMethodCall`.
///
/// # Safety
///
/// `call` must point to a live `FlutterMethodCall`. `callback` is invoked
/// exactly once, on the main queue, with `context`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lovegame_channel_handle(
    call: *mut AnyObject,
    callback: ReplyCallback,
    context: *mut c_void,
) {
    let reply = CallbackReply { callback, context };
    let ios = match channel() {
        Ok(ios) => ios,
        Err(e) => {
            tracing::error!(error = %e, "iOS: call before init");
            let outcome = e.to_outcome();
            // No channel, hence no deliverer: post straight to the main queue.
            let task: Task = Box::new(move || Box::new(reply).send(outcome));
            let _ = MainDispatchContext.post(task);
            return;
        }
    };

    // SAFETY: caller guarantees `call` is a live FlutterMethodCall.
    let Some(call) = (unsafe { call.as_ref() }) else {
        ios.channel
            .reject("", reply, BridgeError::Codec("null method call".into()).to_outcome());
        return;
    };

    if MainThreadMarker::new().is_none() {
        tracing::error!("iOS: method call received off the main thread");
    }

    // SAFETY: `method` and `arguments` are FlutterMethodCall properties.
    let method: Retained<NSString> = unsafe { msg_send![call, method] };
    let arguments: Option<Retained<AnyObject>> = unsafe { msg_send![call, arguments] };
    let arguments = arguments
        .as_deref()
        .map(object_to_value)
        .filter(|v| !v.is_null());

    ios.channel.handle(&method.to_string(), arguments, reply);
}

#[unsafe(no_mangle)]
pub extern "C" fn lovegame_channel_uninstall() {
    if let Ok(ios) = channel() {
        ios.channel.uninstall();
    }
}
