//! Async job behavior: equivalence with the sync forms, pinning, memory
//! accounting and error routing.

use carta_host::{Color, Env, ErrorKind, ExternalMemory, Image, MemoryCounter, Value};
use std::cell::RefCell;
use std::rc::Rc;

type Calls = Rc<RefCell<Vec<Vec<Value>>>>;

fn recorder() -> (Value, Calls) {
    let calls: Calls = Rc::new(RefCell::new(Vec::new()));
    let sink = calls.clone();
    let cb = Value::function(move |args: &[Value]| sink.borrow_mut().push(args.to_vec()));
    (cb, calls)
}

fn gradient(env: &Env, w: u32, h: u32) -> Image {
    let img = Image::with_size(env, w, h).unwrap();
    for (i, p) in img.buffer().write().data_mut().iter_mut().enumerate() {
        let i = i as u32;
        *p = Color::new(i as u8, (i * 3) as u8, (i * 5) as u8, (i * 11 + 40) as u8).to_word();
    }
    img
}

#[test]
fn async_forms_match_sync_forms() {
    type Op = fn(&Image, &Env, &[Value]) -> carta_host::HostResult<Value>;
    type SyncOp = fn(&Image) -> carta_host::HostResult<Value>;
    let ops: [(Op, SyncOp); 3] = [
        (Image::clear, Image::clear_sync),
        (Image::premultiply, Image::premultiply_sync),
        (Image::demultiply, Image::demultiply_sync),
    ];

    let env = Env::new().unwrap();
    for (async_op, sync_op) in ops {
        let a = gradient(&env, 9, 4);
        let b = gradient(&env, 9, 4);
        a.set_background(&Value::Color(Color::rgb(1, 2, 3))).unwrap();
        b.set_background(&Value::Color(Color::rgb(1, 2, 3))).unwrap();

        sync_op(&a).unwrap();
        let (cb, calls) = recorder();
        assert!(async_op(&b, &env, &[cb]).unwrap().is_undefined());
        env.run();

        assert_eq!(calls.borrow().len(), 1);
        assert!(calls.borrow()[0][0].is_null());
        assert_eq!(a.buffer().read().data(), b.buffer().read().data());
    }
}

#[test]
fn clear_callback_gets_only_null() {
    let env = Env::new().unwrap();
    let img = gradient(&env, 2, 2);
    let (cb, calls) = recorder();
    img.clear(&env, &[cb]).unwrap();
    env.run();
    assert_eq!(calls.borrow()[0].len(), 1);
}

#[test]
fn premultiply_callback_gets_image() {
    let env = Env::new().unwrap();
    let img = gradient(&env, 2, 2);
    let (cb, calls) = recorder();
    img.premultiply(&env, &[cb]).unwrap();
    env.run();
    let calls = calls.borrow();
    assert!(calls[0][1].as_image().unwrap().ptr_eq(&img));
}

#[test]
fn dropped_image_still_encodes() {
    let env = Env::new().unwrap();
    let img = gradient(&env, 6, 6);
    let expected = img.encode_sync(&[]).unwrap();

    let (cb, calls) = recorder();
    img.encode(&env, &[cb]).unwrap();
    drop(img);
    assert_eq!(env.announced_memory(), 6 * 6 * 4);

    env.run();
    assert_eq!(calls.borrow()[0][1].as_buffer(), expected.as_buffer());
    assert_eq!(env.announced_memory(), 0);
}

#[test]
fn memory_is_balanced() {
    let counter = Rc::new(MemoryCounter::new());
    let env = Env::builder().memory(counter.clone()).build().unwrap();
    {
        let a = Image::with_size(&env, 10, 10).unwrap();
        let b = Image::with_size(&env, 3, 1).unwrap();
        assert_eq!(counter.total(), 400 + 12);

        let bytes = a.encode_sync(&[]).unwrap();
        let (cb, _calls) = recorder();
        Image::from_bytes(&env, &[bytes, cb]).unwrap();
        env.run();
        // The decoded image is still held by the recorded callback args.
        assert_eq!(counter.total(), 400 + 12 + 400);
        drop(b);
    }
    assert_eq!(counter.total(), 0);
    assert_eq!(counter.adjust(0), 0);
}

#[test]
fn load_failures_reach_the_callback() {
    let env = Env::new().unwrap();
    let (cb, calls) = recorder();
    Image::from_bytes(&env, &[Value::from(vec![1u8, 2, 3]), cb]).unwrap();
    let (cb, open_calls) = recorder();
    Image::open(&env, &["nothing-here.png".into(), cb]).unwrap();
    env.run();

    for calls in [calls, open_calls] {
        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        let err = calls[0][0].as_error().unwrap();
        assert_eq!(err.kind(), ErrorKind::Load);
    }
}

#[test]
fn encode_failures_reach_the_callback() {
    let env = Env::new().unwrap();
    let img = gradient(&env, 2, 2);
    let (cb, calls) = recorder();
    img.encode(&env, &["tiff".into(), cb]).unwrap();
    env.run();
    let err = calls.borrow()[0][0].as_error().cloned().unwrap();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[test]
fn loaders_without_a_callback_return_the_image() {
    let env = Env::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("g.png");
    let img = gradient(&env, 5, 3);
    img.save(&[path.to_str().unwrap().into()]).unwrap();
    let bytes = img.encode_sync(&[]).unwrap();

    let opened = Image::open(&env, &[path.to_str().unwrap().into()]).unwrap();
    let decoded = Image::from_bytes(&env, &[bytes]).unwrap();
    assert_eq!(env.pending(), 0);

    for value in [opened, decoded] {
        let back = value.as_image().unwrap();
        assert_eq!((back.width(), back.height()), (5, 3));
        assert_eq!(back.buffer().read().data(), img.buffer().read().data());
    }
}

#[test]
fn async_from_bytes_matches_sync() {
    let env = Env::new().unwrap();
    let bytes = gradient(&env, 7, 4).encode_sync(&["png32".into()]).unwrap();
    let sync = Image::from_bytes_sync(&env, &[bytes.clone()]).unwrap();

    let (cb, calls) = recorder();
    assert!(Image::from_bytes(&env, &[bytes, cb]).unwrap().is_undefined());
    assert_eq!(env.pending(), 1);
    env.run();

    let calls = calls.borrow();
    assert!(calls[0][0].is_null());
    let decoded = calls[0][1].as_image().unwrap();
    assert_eq!(decoded.buffer().read().data(), sync.buffer().read().data());
}

#[test]
fn non_callable_extra_argument_is_rejected() {
    let env = Env::new().unwrap();
    let img = gradient(&env, 2, 2);
    let bytes = img.encode_sync(&[]).unwrap();
    let missing = "last argument must be a callback function";

    let opts = Value::object([("x", Value::from(1))]);
    let err = img.encode(&env, &["png".into(), opts, 5.into()]).unwrap_err();
    assert_eq!((err.kind(), err.message()), (ErrorKind::Type, missing));
    let err = Image::from_bytes(&env, &[bytes, "not a callback".into()]).unwrap_err();
    assert_eq!((err.kind(), err.message()), (ErrorKind::Type, missing));
    let err = Image::open(&env, &["a.png".into(), 5.into()]).unwrap_err();
    assert_eq!((err.kind(), err.message()), (ErrorKind::Type, missing));
    assert_eq!(env.pending(), 0);
}

#[test]
fn argument_errors_never_call_back() {
    let env = Env::new().unwrap();
    let img = gradient(&env, 2, 2);
    let (cb, calls) = recorder();

    let err = img.encode(&env, &[1.into(), cb.clone()]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
    let err = img.clear(&env, &[1.into()]).unwrap_err();
    assert_eq!(err.message(), "last argument must be a callback function");
    let err = Image::open(&env, &[Value::Null, cb.clone()]).unwrap_err();
    assert_eq!(err.message(), "Argument must be a string");
    let err = Image::from_bytes(&env, &["x".into(), cb.clone()]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);

    assert_eq!(env.pending(), 0);
    assert_eq!(img.pin_count(), 0);
    env.run();
    assert!(calls.borrow().is_empty());
}

#[cfg(feature = "composite")]
mod composite {
    use super::*;

    #[test]
    fn requires_a_callback() {
        let env = Env::new().unwrap();
        let a = gradient(&env, 2, 2);
        let b = gradient(&env, 2, 2);
        let err = a.composite(&env, &[Value::Image(b)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(err.message(), "last argument must be a callback function");
    }

    #[test]
    fn bad_filters_fail_before_queueing() {
        let env = Env::new().unwrap();
        let a = gradient(&env, 2, 2);
        let b = gradient(&env, 2, 2);
        let (cb, calls) = recorder();
        let opts = Value::object([("image_filters", Value::from("blur("))]);
        let err = a.composite(&env, &[Value::Image(b), opts, cb]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FilterParse);
        assert_eq!(env.pending(), 0);
        env.run();
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn bad_mode_is_a_type_error() {
        let env = Env::new().unwrap();
        let a = gradient(&env, 2, 2);
        let b = gradient(&env, 2, 2);
        let (cb, _) = recorder();
        let opts = Value::object([("comp_op", Value::from(99))]);
        let err = a.composite(&env, &[Value::Image(b), opts, cb]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn filters_apply_to_the_source() {
        let env = Env::new().unwrap();
        let target = Image::with_size(&env, 2, 1).unwrap();
        let source = Image::with_size(&env, 2, 1).unwrap();
        source.buffer().write().fill(Color::rgb(0, 0, 0));

        let (cb, calls) = recorder();
        let opts = Value::object([
            ("comp_op", Value::from(1)),
            ("image_filters", Value::from("invert")),
        ]);
        target.composite(&env, &[Value::Image(source.clone()), opts, cb]).unwrap();
        env.run();

        assert!(calls.borrow()[0][0].is_null());
        let white = Color::rgb(255, 255, 255).to_word();
        assert_eq!(source.buffer().read().data(), &[white, white]);
        assert_eq!(target.buffer().read().data(), &[white, white]);
    }

    #[test]
    fn offset_source_over() {
        let env = Env::new().unwrap();
        let target = Image::with_size(&env, 3, 1).unwrap();
        let source = Image::with_size(&env, 1, 1).unwrap();
        let red = Color::rgb(255, 0, 0).to_word();
        source.buffer().write().fill(Color::rgb(255, 0, 0));

        let (cb, _) = recorder();
        let opts = Value::object([("dx", Value::from(2))]);
        target.composite(&env, &[Value::Image(source), opts, cb]).unwrap();
        env.run();
        assert_eq!(target.buffer().read().data(), &[0, 0, red]);
    }

    #[test]
    fn options_are_checked_after_the_callback() {
        let env = Env::new().unwrap();
        let a = gradient(&env, 2, 2);
        let b = gradient(&env, 2, 2);
        let opts = Value::object([("comp_op", Value::from("x"))]);
        let err = a.composite(&env, &[Value::Image(b.clone()), opts]).unwrap_err();
        assert_eq!(err.message(), "last argument must be a callback function");

        let (cb, _) = recorder();
        let err = a.composite(&env, &[1.into(), cb]).unwrap_err();
        assert_eq!(err.message(), "Image expected as first arg");
        assert_eq!(env.pending(), 0);
    }

    #[test]
    fn out_of_range_opacity_is_clamped() {
        let env = Env::new().unwrap();
        let clamped = gradient(&env, 3, 3);
        let full = gradient(&env, 3, 3);
        let source = gradient(&env, 3, 3);

        let (cb, calls) = recorder();
        let opts = Value::object([("opacity", Value::from(2.0))]);
        clamped.composite(&env, &[Value::Image(source.clone()), opts, cb]).unwrap();
        let (cb, _) = recorder();
        full.composite(&env, &[Value::Image(source), cb]).unwrap();
        env.run();

        assert!(calls.borrow()[0][0].is_null());
        assert_eq!(clamped.buffer().read().data(), full.buffer().read().data());
    }
}

#[cfg(not(feature = "composite"))]
#[test]
fn composite_is_unsupported() {
    let env = Env::new().unwrap();
    let a = gradient(&env, 2, 2);
    let b = gradient(&env, 2, 2);
    let (cb, _) = recorder();
    let err = a.composite(&env, &[Value::Image(b), cb]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}
