mod common;
use common::{definitions, run_pipeline};

#[test]
fn hello() {
    let ir = run_pipeline(include_str!("../demos/hello.sbl"));
    assert_eq!(
        definitions(&ir),
        [
            "Function_Program_new",
            "Function_Program_Main",
            "Function_Void_new",
            "Function_Console_new",
            "Function_Console_Print_String",
            "Function_String_new",
        ]
    );
    assert!(ir.contains("call void @Function_Console_Print_String(ptr @.str.0)"));
}

#[test]
fn system() {
    let ir = run_pipeline(include_str!("../demos/system.sbl"));
    assert!(ir.contains("define ptr @Function_Program_New_System(ptr %0) {"));
    assert!(ir.contains("define ptr @Function_FileSystem_Describe_String(ptr %0) {"));
    assert!(ir.contains("define void @Function_Program_Run_System_String(ptr %0, ptr %1) {"));
    assert!(ir.contains("call void (ptr, ...) @stderr_print(ptr @.str.0)"));
}

#[test]
fn overloads() {
    let ir = run_pipeline(include_str!("../demos/overloads.sbl"));
    let definitions = definitions(&ir);
    assert!(definitions.contains(&"Function_Greeter_Greet_String"));
    assert!(definitions.contains(&"Function_Greeter_Greet_Greeter"));
}
