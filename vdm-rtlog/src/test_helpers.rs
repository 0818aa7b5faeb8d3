// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use indoc::indoc;

/// Two CPUs connected by a bus. A thread on CPU 1 calls an operation on CPU 2 and gets a reply.
pub(crate) const TWO_CPUS: &str = indoc! {r#"
    CPUdecl -> id: 1 expl: true sys: "Sys" name: "Controller" time: 0
    BUSdecl -> id: 1 topo: {1, 2} name: "net" time: 0
    DeployObj -> objref: 3 clnm: "Sensor" cpunm: 1 time: 0
    ThreadCreate -> id: 7 period: false objref: 3 clnm: "Sensor" cpunm: 1 time: 0
    ThreadSwapIn -> id: 7 objref: 3 clnm: "Sensor" cpunm: 1 overhead: 0 time: 0
    OpRequest -> id: 7 opname: "Sensor`read" objref: 3 clnm: "Sensor" cpunm: 1 async: false time: 2
    MessageRequest -> busid: 1 fromcpu: 1 tocpu: 2 msgid: 1 callthr: 7 opname: "Actuator`set" objref: 4 clnm: "Actuator" size: 64 time: 4
    MessageActivate -> msgid: 1 time: 4
    MessageCompleted -> msgid: 1 time: 6
    ThreadCreate -> id: 9 period: false objref: 4 clnm: "Actuator" cpunm: 2 time: 6
    ReplyRequest -> busid: 1 fromcpu: 2 tocpu: 1 msgid: 2 origmsgid: 1 callthr: 7 calleethr: 9 size: 8 time: 10
    MessageCompleted -> msgid: 2 time: 12
    ThreadKill -> id: 7 cpunm: 1 time: 14
"#};

