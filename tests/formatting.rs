// SPDX-License-Identifier: MIT OR Apache-2.0

#[cfg(test)]
mod tests {
    use linewise::{
        Block, Config, Formatter, Level, LogSystem, Logger, MemoryDevice, Route, SplunkPair, Uplevel,
    };
    use serde::Serialize;
    use std::io;

    const PRELUDE: &str = "2009/11/10 15:00:00.000: LOG[69910]: file.go#512: TEST: ";

    /// Runs `f` against a fresh deterministic system and returns what it wrote.
    fn capture(f: impl FnOnce(&std::sync::Arc<LogSystem>)) -> String {
        let memory = MemoryDevice::new();
        let system = LogSystem::new();
        system.init(
            Config::for_tests("LOG", 10)
                .route(Route::all(memory.device()))
                .termination_hook(|_| {}),
        );
        f(&system);
        system.shutdown();
        memory.contents()
    }

    #[derive(Serialize)]
    struct Order {
        id: u32,
        items: Vec<&'static str>,
    }

    struct Hex(&'static [u8]);

    impl Formatter for Hex {
        fn format(&self) -> String {
            self.0.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ")
        }
    }

    type Case = (String, Box<dyn Fn(&Uplevel)>);

    fn case(rest: &str, call: impl Fn(&Uplevel) + 'static) -> Case {
        (format!("{PRELUDE}{rest}"), Box::new(call))
    }

    fn cases() -> Vec<Case> {
        vec![
            case("foo: Started:\n", |l: &Uplevel| l.start("TEST", "foo")),
            case("foo: Started: walrus[500]\n", |l: &Uplevel| {
                l.startf("TEST", "foo", format_args!("walrus[{}]", 500))
            }),
            case("bar: Completed:\n", |l: &Uplevel| l.complete("TEST", "bar")),
            case("bar: Completed: horse[3]\n", |l: &Uplevel| {
                l.completef("TEST", "bar", format_args!("horse[{}]", 3))
            }),
            case("baz: Completed ERROR: A\n", |l: &Uplevel| {
                l.complete_err(io::Error::other("A"), "TEST", "baz")
            }),
            case("baz: Completed ERROR: puppies[777]: B\n", |l: &Uplevel| {
                l.complete_errf(io::Error::other("B"), "TEST", "baz", format_args!("puppies[{}]", 777))
            }),
            case("boo: ERROR: C\n", |l: &Uplevel| l.err("C", "TEST", "boo")),
            case("bee: ERROR: ip[127.0.0.1]: D\n", |l: &Uplevel| {
                l.errf("D", "TEST", "bee", format_args!("ip[{}]", "127.0.0.1"))
            }),
            case("faa: Trace: len[13]\n", |l: &Uplevel| {
                l.tracef("TEST", "faa", format_args!("len[{}]", 13))
            }),
            case("fii: Warning: usage[99.900000]\n", |l: &Uplevel| {
                l.warnf("TEST", "fii", format_args!("usage[{:.6}]", 99.9))
            }),
            case("beer: Query: howmany[0]\n", |l: &Uplevel| {
                l.queryf("TEST", "beer", format_args!("howmany[{}]", 0))
            }),
            case("oom: DATA: 2b: !2b\n", |l: &Uplevel| l.data_kv("TEST", "oom", "2b", "!2b")),
            case("moo: DATA:\n\tasdf I'm running out of ideas.\n", |l: &Uplevel| {
                l.data_block("TEST", "moo", "asdf I'm running out of ideas.")
            }),
            case("moo: DATA:\n\t5\n", |l: &Uplevel| {
                l.data_block("TEST", "moo", Block::json(&5))
            }),
            case(
                "moo: DATA:\n\t{\n\t    \"id\": 7,\n\t    \"items\": [\n\t        \"tea\"\n\t    ]\n\t}\n",
                |l: &Uplevel| {
                    let order = Order {
                        id: 7,
                        items: vec!["tea"],
                    };
                    l.data_block("TEST", "moo", Block::json(&order))
                },
            ),
            case("roo: DATA:\n\tfirst\n\tsecond\n", |l: &Uplevel| {
                l.data_string("TEST", "roo", "first\n\n\nsecond\n")
            }),
            case("roo: DATA: %!ds(MISSING)\n", |l: &Uplevel| l.data_string("TEST", "roo", "")),
            case("roo: DATA:\n", |l: &Uplevel| l.data_string("TEST", "roo", "\n\n\n\n")),
            case("hex: DATA:\n\tee ef\n\tsecond\n", |l: &Uplevel| {
                l.data_trace("TEST", "hex", &[&Hex(&[0xee, 0xef]), &"\nsecond\n"])
            }),
            case("hex: DATA:\n", |l: &Uplevel| l.data_trace("TEST", "hex", &[])),
        ]
    }

    #[test]
    fn package_level_proxy() {
        for (expected, call) in cases() {
            let got = capture(|system| call(&system.log()));
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn logger_and_its_up1_proxy_match() {
        for (expected, call) in cases() {
            let direct = capture(|system| {
                let log = Logger::with_system(system, "test", || Level::Trace);
                call(&*log);
            });
            let up1 = capture(|system| {
                let log = Logger::with_system(system, "test", || Level::Trace);
                call(log.up1());
            });
            assert_eq!(direct, expected);
            assert_eq!(up1, expected);
        }
    }

    #[test]
    fn unserializable_block_embeds_the_error() {
        let got = capture(|system| {
            let mut map = std::collections::BTreeMap::new();
            map.insert((1, 2), "tuple keys are not strings");
            system.log().data_block("TEST", "bad", Block::json(&map));
        });
        assert_eq!(got, format!("{PRELUDE}bad: DATA:\n\tkey must be a string\n"));

        let got = capture(|system| system.log().data_block("TEST", "nan", Block::json(&f64::NAN)));
        assert_eq!(got, format!("{PRELUDE}nan: DATA:\n\tunsupported value: NaN\n"));
    }

    #[test]
    fn fatal_lines() {
        let got = capture(|system| {
            let outcome = system.log().err_fatal("E", "TEST", "fatal");
            assert_eq!(outcome, Some(linewise::Fatal::Exit(1)));
        });
        assert_eq!(
            got,
            format!("{PRELUDE}fatal: ERROR: E\n{PRELUDE}fatal: TERMINATING\n")
        );

        let got = capture(|system| {
            let _ = system.log().err_panicf("E", "TEST", "panic", format_args!("ctx[{}]", 1));
        });
        assert_eq!(
            got,
            format!("{PRELUDE}panic: ERROR: ctx[1]: E\n{PRELUDE}panic: TERMINATING\n")
        );
    }

    #[test]
    fn splunk_lines() {
        let got = capture(|system| {
            let pairs = [
                SplunkPair::new("Key1", "Value1"),
                SplunkPair::new("RequestTime", "2019/11/10 15:00:00.000"),
                SplunkPair::new("MAC", "010203040506"),
                SplunkPair::new("ResponseCode", 0),
                SplunkPair::new("Slice", vec![1, 2, 3, 4]),
                SplunkPair::new("name1", vec!["123.123", "123.124"]),
            ];
            system.log().splunk(&pairs);
        });
        assert_eq!(
            got,
            "2009/11/10 15:00:00.000: Key1=Value1 RequestTime=\"2019/11/10 15:00:00.000\" MAC=010203040506 ResponseCode=0 Slice=[1, 2, 3, 4] name1=[123.123, 123.124]\n"
        );
    }

    #[test]
    fn empty_function_name_is_filled_from_the_stack() {
        let got = capture(|system| system.log().tracef("TEST", "", "x"));
        assert_eq!(got, format!("{PRELUDE}empty_function_name_is_filled_from_the_stack: Trace: x\n"));

        let got = capture(|system| system.log().at(None).tracef("TEST", "", "x"));
        assert_eq!(got, format!("{PRELUDE}missing: Trace: x\n"));
    }

    #[test]
    fn function_name_macro_fills_in_the_caller() {
        let got = capture(|system| system.log().start("TEST", linewise::function_name!()));
        assert_eq!(got, format!("{PRELUDE}function_name_macro_fills_in_the_caller: Started:\n"));
    }
}
