//! Settings and script samples shared by the unit tests.

pub const CANONICAL_SETTINGS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<documentburster>
  <settings>
    <version>9.9.9</version>
    <template>My Reports</template>
    <burstfilename>${burst_token}.${output_type_extension}</burstfilename>
    <mergefilename>merged.pdf</mergefilename>
    <outputfolder>output/${input_document_name}/${now?string["yyyy.MM.dd_HH.mm.ss.SSS"]}</outputfolder>
    <backupfolder>backup/${input_document_name}/${now?string["yyyy.MM.dd_HH.mm.ss.SSS"]}</backupfolder>
    <quarantinefolder>quarantine/${input_document_name}/${now?string["yyyy.MM.dd_HH.mm.ss.SSS"]}</quarantinefolder>
    <sendfiles>
      <email>false</email>
      <upload>false</upload>
      <web>false</web>
      <sms>false</sms>
    </sendfiles>
    <deletefiles>false</deletefiles>
    <quarantinefiles>true</quarantinefiles>
    <htmlemail>true</htmlemail>
    <numberofuservariables>20</numberofuservariables>
    <sortbyposition>true</sortbyposition>
    <bursttokendelimiters>
      <start>{</start>
      <end>}</end>
      <start2nd>[</start2nd>
      <end2nd>]</end2nd>
    </bursttokendelimiters>
    <emailserver>
      <host>Email Server Host</host>
      <port>25</port>
      <userid>From Email User ID</userid>
      <userpassword>From Email Password</userpassword>
      <usessl>false</usessl>
      <usetls>false</usetls>
      <debug>false</debug>
      <fromaddress>from@emailaddress.com</fromaddress>
      <name>From Name</name>
      <useconn>false</useconn>
      <conncode/>
    </emailserver>
    <emailsettings>
      <to>${burst_token}</to>
      <cc/>
      <bcc/>
      <subject/>
      <text/>
      <html/>
    </emailsettings>
    <uploadsettings>
      <ftpcommand/>
    </uploadsettings>
    <qualityassurance>
      <emailserver>
        <port>1025</port>
      </emailserver>
    </qualityassurance>
  </settings>
</documentburster>
"#;

/// Oldest supported layout: no template, single `sendfiles` flag, legacy
/// message and upload containers, `$name$` markers.
pub const LEGACY_51_SETTINGS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<documentburster>
  <settings>
    <version>5.1</version>
    <burstfilename>$burst_token$.$input_document_extension$</burstfilename>
    <mergefilename>merged.pdf</mergefilename>
    <outputfolder>output/$input_document_name$/$now;format="yyyy.MM.dd_HH.mm.ss"$</outputfolder>
    <backupfolder>backup/$input_document_name$/$now;format="yyyy.MM.dd_HH.mm.ss"$</backupfolder>
    <quarantinefolder>quarantine/$input_document_name$/$now;format="yyyy.MM.dd_HH.mm.ss"$</quarantinefolder>
    <sendfiles>false</sendfiles>
    <deletefiles>false</deletefiles>
    <quarantinefiles>true</quarantinefiles>
    <htmlemail>false</htmlemail>
    <numberofuservariables>10</numberofuservariables>
    <bursttokendelimiters>
      <start>{</start>
      <end>}</end>
      <start2nd>[</start2nd>
      <end2nd>]</end2nd>
    </bursttokendelimiters>
    <emailserver>
      <host>Email Server Host</host>
      <port>25</port>
      <userid>From Email User ID</userid>
      <userpassword>From Email Password</userpassword>
      <usessl>false</usessl>
      <usetls>false</usetls>
      <debug>false</debug>
      <fromaddress>from@emailaddress.com</fromaddress>
      <name>From Name</name>
    </emailserver>
    <defaultmessage>
      <to>$burst_token$</to>
      <cc/>
      <bcc/>
      <subject/>
      <text/>
    </defaultmessage>
    <defaultftp>
      <url>ftp://</url>
    </defaultftp>
  </settings>
</documentburster>
"#;

/// Customized profile: custom file name, output folder and subject.
pub const LEGACY_CUSTOM_SETTINGS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<documentburster>
  <settings>
    <version>6.1</version>
    <template>My Reports</template>
    <burstfilename>custom-$var0$.${output_type_extension}</burstfilename>
    <mergefilename>merged.pdf</mergefilename>
    <outputfolder>custom-output path</outputfolder>
    <backupfolder>backup/$input_document_name$/$now;format="yyyy.MM.dd_HH.mm.ss"$</backupfolder>
    <quarantinefolder>quarantine/$input_document_name$/$now;format="yyyy.MM.dd_HH.mm.ss"$</quarantinefolder>
    <sendfiles>
      <email>false</email>
      <upload>false</upload>
    </sendfiles>
    <deletefiles>false</deletefiles>
    <quarantinefiles>true</quarantinefiles>
    <htmlemail>true</htmlemail>
    <numberofuservariables>10</numberofuservariables>
    <sortbyposition>false</sortbyposition>
    <emailserver>
      <host>Email Server Host</host>
      <port>25</port>
      <userid>From Email User ID</userid>
      <userpassword>From Email Password</userpassword>
      <usessl>false</usessl>
      <usetls>false</usetls>
      <debug>false</debug>
      <fromaddress>from@emailaddress.com</fromaddress>
      <name>From Name</name>
      <useconn>true</useconn>
      <conncode>eml-01</conncode>
    </emailserver>
    <emailsettings>
      <to>$burst_token$</to>
      <cc/>
      <bcc/>
      <subject>custom subject $var0$</subject>
      <text/>
      <html/>
    </emailsettings>
    <uploadsettings>
      <ftpcommand/>
    </uploadsettings>
    <qualityassurance>
      <emailserver>
        <port>2525</port>
      </emailserver>
    </qualityassurance>
  </settings>
</documentburster>
"#;

pub fn legacy_fixtures() -> Vec<(&'static str, &'static str)> {
    vec![
        ("00-settings-5.1.xml", LEGACY_51_SETTINGS),
        ("10-settings-6.1-custom.xml", LEGACY_CUSTOM_SETTINGS),
        ("settings.xml", CANONICAL_SETTINGS),
    ]
}

pub const LEGACY_STAMP_SCRIPT: &str = r#"import com.smartwish.documentburster.variables.Variables

def inputFile = ctx.extractFilePath
def pdfBoxClassPath = "lib/burst/pdfbox-1.8.2.jar;lib/burst/fontbox-1.8.2.jar;lib/burst/jempbox-1.8.2.jar;lib/burst/commons-logging-1.1.1.jar"

def execOptions = "java -cp $pdfBoxClassPath org.apache.pdfbox.Overlay samples/stamp.pdf \"$inputFile\" \"$inputFile\""

ant.exec(append: "true", failonerror: "true", output: "logs/stamp.log", executable: "cmd") {
    arg(value: "/c")
    arg(value: "$execOptions")
}
"#;
